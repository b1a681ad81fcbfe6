//! Ledger errors

use eventsync_core::{Error, RequestId};
use thiserror::Error;

/// Reasons a request id cannot be reserved or replayed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The original request is still being applied and did not finish in time
    #[error("request {request_id} is still in flight")]
    RequestInFlight {
        /// The contended id
        request_id: RequestId,
    },

    /// The id is bound to a request with a different fingerprint
    #[error("request id {request_id} reused for a different request")]
    ReuseMismatch {
        /// The reused id
        request_id: RequestId,
    },
}

impl From<LedgerError> for Error {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::RequestInFlight { request_id } => Error::RequestInFlight { request_id },
            LedgerError::ReuseMismatch { request_id } => Error::RequestIdReuseMismatch { request_id },
        }
    }
}
