//! Core types for eventsync
//!
//! This crate defines the foundational types shared by every layer:
//! - ProjectId, EventId, UserId, RequestId: identifiers
//! - Version: per-event mutation counter used for compare-and-swap
//! - Timestamp: microsecond timestamps
//! - Event, EventFields: scheduled events and their editable fields
//! - ChangeRecord, ChangeKind: the unit broadcast to subscribers
//! - Limits: input validation
//! - Error: the error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod error;
pub mod event;
pub mod limits;
pub mod types;

pub use contract::{Timestamp, Version};
pub use error::{Error, Result};
pub use event::{ChangeKind, ChangeRecord, Event, EventFields};
pub use limits::{Limits, MAX_TITLE_CHARS};
pub use types::{EventId, ProjectId, RequestId, UserId};
