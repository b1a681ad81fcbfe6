//! Error types for eventsync
//!
//! Every layer reports failures through [`Error`]. The variants are split so
//! the HTTP boundary can tell expected, recoverable outcomes (conflicts,
//! authorization failures, bad input) apart from internal failures.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::event::Event;
use crate::types::{EventId, ProjectId, RequestId, UserId};
use crate::Version;
use thiserror::Error;

/// Result type alias for eventsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy
///
/// | Category | Variants |
/// |----------|----------|
/// | Authentication | `Unauthenticated` |
/// | Authorization | `Forbidden` |
/// | Not Found | `ProjectNotFound`, `EventNotFound` |
/// | Concurrency | `VersionConflict`, `RequestInFlight`, `RequestIdReuseMismatch` |
/// | Validation | `InvalidInput` |
/// | Capacity | `SubscriberLimitReached` |
/// | System | `Internal` |
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Missing or unknown session token
    #[error("missing or invalid session token")]
    Unauthenticated,

    /// Valid token, but the user is not a member of the project
    #[error("user {user} is not a member of project {project}")]
    Forbidden {
        /// Authenticated user
        user: UserId,
        /// Project the user tried to access
        project: ProjectId,
    },

    /// Unknown project
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// Unknown event, or an event that belongs to another project
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// Compare-and-swap lost: the stored version differs from the expected one
    ///
    /// Carries the current server-side event so the caller can merge and retry
    /// without another round trip.
    #[error("version conflict on event {}: expected {expected}, current {}", .current.id, .current.version)]
    VersionConflict {
        /// Version the caller based its change on
        expected: Version,
        /// Current stored state
        current: Box<Event>,
    },

    /// Another call with the same request id is still being applied
    #[error("request {request_id} is still in flight")]
    RequestInFlight {
        /// The contended request id
        request_id: RequestId,
    },

    /// A request id was reused for a different logical request
    #[error("request id {request_id} was already used for a different request")]
    RequestIdReuseMismatch {
        /// The reused request id
        request_id: RequestId,
    },

    /// Malformed or out-of-range input
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        /// Offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// The project already has the maximum number of live subscriptions
    #[error("project {project} reached its limit of {max} subscriptions")]
    SubscriberLimitReached {
        /// Project being subscribed to
        project: ProjectId,
        /// Configured cap
        max: usize,
    },

    /// Unexpected failure (storage, invariant breach); never retried by the server
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an `InvalidInput` error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build an `Internal` error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Build a `VersionConflict` from the current stored event
    pub fn version_conflict(expected: Version, current: Event) -> Self {
        Error::VersionConflict {
            expected,
            current: Box::new(current),
        }
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated => "unauthenticated",
            Error::Forbidden { .. } => "forbidden",
            Error::ProjectNotFound(_) => "project_not_found",
            Error::EventNotFound(_) => "event_not_found",
            Error::VersionConflict { .. } => "version_conflict",
            Error::RequestInFlight { .. } => "request_in_flight",
            Error::RequestIdReuseMismatch { .. } => "request_id_reuse_mismatch",
            Error::InvalidInput { .. } => "invalid_input",
            Error::SubscriberLimitReached { .. } => "subscriber_limit_reached",
            Error::Internal(_) => "internal",
        }
    }

    /// Expected outcomes a client can recover from by refreshing or retrying
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::VersionConflict { .. } | Error::RequestInFlight { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_event() -> Event {
        Event {
            id: EventId::new(4),
            project_id: ProjectId::new(1),
            title: "standup".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            version: Version::new(2),
            deleted: false,
        }
    }

    #[test]
    fn test_error_display_version_conflict() {
        let err = Error::version_conflict(Version::new(1), sample_event());
        let msg = err.to_string();
        assert!(msg.contains("version conflict"));
        assert!(msg.contains("v1"));
        assert!(msg.contains("v2"));
    }

    #[test]
    fn test_error_display_forbidden() {
        let err = Error::Forbidden {
            user: UserId::new("mallory"),
            project: ProjectId::new(7),
        };
        assert_eq!(err.to_string(), "user mallory is not a member of project 7");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::invalid_input("date", "expected YYYY-MM-DD");
        assert_eq!(err.to_string(), "invalid date: expected YYYY-MM-DD");
    }

    #[test]
    fn test_conflicts_are_distinguishable_from_internal_failures() {
        assert!(Error::version_conflict(Version::new(1), sample_event()).is_conflict());
        assert!(Error::RequestInFlight {
            request_id: RequestId::new()
        }
        .is_conflict());
        assert!(!Error::internal("disk on fire").is_conflict());
        assert!(!Error::Unauthenticated.is_conflict());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Unauthenticated.code(), "unauthenticated");
        assert_eq!(
            Error::EventNotFound(EventId::new(1)).code(),
            "event_not_found"
        );
        assert_eq!(
            Error::version_conflict(Version::new(1), sample_event()).code(),
            "version_conflict"
        );
    }
}
