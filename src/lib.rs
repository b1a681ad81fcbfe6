//! eventsync - collaborative event synchronization service
//!
//! Members of a shared project create, edit and delete dated events
//! concurrently. Stale edits are rejected through per-event version numbers,
//! retried creates are deduplicated by request id, and every accepted change
//! is pushed to the project's open WebSocket connections.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use eventsync::{build_router, EventsyncConfig, MutationEngine};
//!
//! let config = EventsyncConfig::from_file("eventsync.toml".as_ref())?;
//! let engine = Arc::new(MutationEngine::from_config(&config));
//! let app = build_router(engine);
//! ```
//!
//! # Architecture
//!
//! - `eventsync-core`: ids, versions, events, limits, errors
//! - `eventsync-storage`: compare-and-swap version store
//! - `eventsync-concurrency`: idempotency ledger
//! - `eventsync-engine`: mutation engine, notification hub, access, config
//! - `eventsync-api`: axum routes and the WebSocket stream

pub use eventsync_api::{build_router, serve, ApiError, AppState};
pub use eventsync_concurrency::{IdempotencyLedger, LedgerConfig};
pub use eventsync_core::{
    ChangeKind, ChangeRecord, Error, Event, EventId, ProjectId, RequestId, Result, UserId,
    Version,
};
pub use eventsync_engine::{
    spawn_maintenance, AccessDirectory, EventsyncConfig, HubConfig, MutationEngine,
    NotificationHub, StaticDirectory, Subscription, CONFIG_FILE_NAME,
};
pub use eventsync_storage::{ShardedVersionStore, VersionStore};
