//! Concurrency layer for eventsync
//!
//! This crate implements request deduplication:
//! - IdempotencyLedger: pending → committed state machine per request id
//! - Reservation: RAII right to apply a request id, aborted on drop
//! - Fingerprint: SHA-256 digest detecting request id reuse
//!
//! Per-event optimistic concurrency lives in the version store's
//! compare-and-swap; this crate covers the retry side of creates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod fingerprint;
pub mod ledger;

pub use error::LedgerError;
pub use fingerprint::Fingerprint;
pub use ledger::{
    IdempotencyLedger, IdempotencyRecord, LedgerConfig, Reservation, Reserve,
    DEFAULT_PENDING_WAIT, DEFAULT_RETENTION,
};
