//! Storage layer for eventsync
//!
//! This crate implements the version store:
//! - VersionStore: the per-event compare-and-swap contract
//! - ShardedVersionStore: DashMap-sharded in-memory implementation
//! - VersionChain: bounded per-event version history
//! - StoredEvent / Mutation: stored versions and the transitions applied to them
//!
//! A durable backend implements `VersionStore` with a conditional single-row
//! update in place of the per-event mutex.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod sharded;
pub mod stored_event;
pub mod traits;

pub use sharded::{ShardedVersionStore, VersionChain, DEFAULT_HISTORY_DEPTH};
pub use stored_event::{Mutation, StoredEvent};
pub use traits::VersionStore;
