//! The version store contract
//!
//! A `VersionStore` holds each event's current state and its monotonic
//! version counter. Implementations must make `compare_and_swap` atomic per
//! event id without serializing unrelated events behind one lock.
//!
//! The `*_then` variants run a commit hook while the event is still locked.
//! Anything the hook emits for one event is therefore ordered by version.

use crate::stored_event::{Mutation, StoredEvent};
use eventsync_core::{EventFields, EventId, ProjectId, Result, UserId, Version};

/// Versioned event storage with per-event compare-and-swap
pub trait VersionStore: Send + Sync {
    /// Latest stored state of an event, tombstones included
    ///
    /// Fails with `EventNotFound` for unknown ids.
    fn get(&self, event_id: EventId) -> Result<StoredEvent>;

    /// Store a new event at `Version::INITIAL`
    fn create(
        &self,
        project_id: ProjectId,
        fields: EventFields,
        actor: &UserId,
    ) -> Result<StoredEvent> {
        self.create_then(project_id, fields, actor, &|_| {})
    }

    /// `create`, calling `on_commit` before any other caller can observe or
    /// mutate the new event
    fn create_then(
        &self,
        project_id: ProjectId,
        fields: EventFields,
        actor: &UserId,
        on_commit: &dyn Fn(&StoredEvent),
    ) -> Result<StoredEvent>;

    /// Apply `mutation` if the stored version equals `expected`
    ///
    /// On success the event moves to `expected.next()`. A version mismatch or
    /// an already-tombstoned event fails with `VersionConflict` carrying the
    /// current state; unknown ids fail with `EventNotFound`.
    fn compare_and_swap(
        &self,
        event_id: EventId,
        expected: Version,
        mutation: Mutation,
        actor: &UserId,
    ) -> Result<StoredEvent> {
        self.compare_and_swap_then(event_id, expected, mutation, actor, &|_| {})
    }

    /// `compare_and_swap`, calling `on_commit` with the new state while the
    /// event is still locked
    ///
    /// The hook is not called when the swap is rejected.
    fn compare_and_swap_then(
        &self,
        event_id: EventId,
        expected: Version,
        mutation: Mutation,
        actor: &UserId,
        on_commit: &dyn Fn(&StoredEvent),
    ) -> Result<StoredEvent>;

    /// Non-deleted events of a project in creation order
    fn list_project(&self, project_id: ProjectId) -> Result<Vec<StoredEvent>>;

    /// Retained versions of an event, newest first
    fn history(&self, event_id: EventId, limit: Option<usize>) -> Result<Vec<StoredEvent>>;

    /// Number of stored events including tombstones
    fn len(&self) -> usize;

    /// Whether the store holds no events
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
