//! HTTP error mapping
//!
//! | Error | Status |
//! |-------|--------|
//! | `Unauthenticated` | 401 |
//! | `Forbidden` | 403 |
//! | `ProjectNotFound`, `EventNotFound` | 404 |
//! | `VersionConflict` | 409, body carries `current` |
//! | `RequestInFlight` | 409, `Retry-After: 1` |
//! | `RequestIdReuseMismatch` | 422 |
//! | `InvalidInput` | 400 |
//! | `SubscriberLimitReached` | 503 |
//! | `Internal` | 500 |
//!
//! Bodies are `{"error": "<code>", "message": "<text>"}`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use eventsync_core::{Error, Event};
use serde::Serialize;
use tracing::{debug, error};

/// Seconds a client should wait before retrying an in-flight request id
pub const RETRY_AFTER_SECS: u64 = 1;

/// Errors returned by HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Failure reported by the engine
    #[error(transparent)]
    Domain(#[from] Error),

    /// A plain HTTP request hit the WebSocket endpoint
    #[error("websocket upgrade required")]
    UpgradeRequired,
}

/// Result alias for handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<&'a Event>,
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UpgradeRequired => StatusCode::UPGRADE_REQUIRED,
            ApiError::Domain(err) => match err {
                Error::Unauthenticated => StatusCode::UNAUTHORIZED,
                Error::Forbidden { .. } => StatusCode::FORBIDDEN,
                Error::ProjectNotFound(_) | Error::EventNotFound(_) => StatusCode::NOT_FOUND,
                Error::VersionConflict { .. } | Error::RequestInFlight { .. } => {
                    StatusCode::CONFLICT
                }
                Error::RequestIdReuseMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                Error::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                Error::SubscriberLimitReached { .. } => StatusCode::SERVICE_UNAVAILABLE,
                Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::UpgradeRequired => "upgrade_required",
            ApiError::Domain(err) => err.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(target: "eventsync::api", status = status.as_u16(), error = %self, "Request failed");
        } else {
            debug!(target: "eventsync::api", status = status.as_u16(), error = %self, "Request rejected");
        }

        let current = match &self {
            ApiError::Domain(Error::VersionConflict { current, .. }) => Some(&**current),
            _ => None,
        };
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
            current,
        };
        let mut response = (status, Json(body)).into_response();

        if matches!(self, ApiError::Domain(Error::RequestInFlight { .. })) {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(RETRY_AFTER_SECS),
            );
        }
        response
    }
}
