//! Engine layer for eventsync
//!
//! This crate wires the lower layers into the service:
//! - MutationEngine: authorize, validate, deduplicate, compare-and-swap, publish
//! - NotificationHub / Subscription: per-project fan-out over bounded queues
//! - AccessDirectory / StaticDirectory: session tokens and project membership
//! - EventsyncConfig: `eventsync.toml` loading and validation
//! - spawn_maintenance: periodic idempotency ledger sweep
//!
//! The engine is the only component that knows about:
//! - Who may touch which project
//! - Ordering between store commits and notifications

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod config;
pub mod engine;
pub mod hub;
pub mod maintenance;

pub use access::{AccessDirectory, StaticDirectory};
pub use config::{EventsyncConfig, CONFIG_FILE_NAME};
pub use engine::MutationEngine;
pub use hub::{
    DropReason, HubConfig, NotificationHub, PublishReport, Subscription,
    DEFAULT_MAX_SUBSCRIBERS_PER_PROJECT, DEFAULT_OUTBOUND_QUEUE,
};
pub use maintenance::spawn_maintenance;
