//! HTTP and WebSocket surface for eventsync
//!
//! This crate exposes the mutation engine over axum:
//! - REST routes for creating, editing, deleting and reading events
//! - A per-project WebSocket change stream
//! - Error-to-status mapping with a stable JSON error body
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use eventsync_api::build_router;
//! use eventsync_engine::{EventsyncConfig, MutationEngine};
//!
//! let engine = Arc::new(MutationEngine::from_config(&EventsyncConfig::default()));
//! let app = build_router(engine);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod ws;

pub use auth::Actor;
pub use error::{ApiError, ApiResult};
pub use router::{build_router, serve};
pub use state::AppState;
