//! Sharded in-memory version store
//!
//! # Design
//!
//! - DashMap keyed by EventId: sharded lookups, no global lock
//! - Per-event `Mutex<VersionChain>`: the compare-and-swap linearization point
//! - Per-project index of event ids for listing
//!
//! The DashMap shard guard is released before the event's own mutex is
//! taken, so a slow CAS on one event never holds up lookups of others.
//!
//! # Version Handling
//!
//! Each event carries its own counter. The chain keeps the current state plus
//! up to `history_depth` prior versions, newest first.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use eventsync_core::{
    Error, Event, EventFields, EventId, ProjectId, Result, UserId, Version,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::stored_event::{Mutation, StoredEvent};
use crate::traits::VersionStore;

/// Default number of prior versions retained per event
pub const DEFAULT_HISTORY_DEPTH: usize = 16;

/// Version chain of a single event
///
/// The current state is held separately from older versions so it is always
/// present. Older versions are stored newest-first.
#[derive(Debug, Clone)]
pub struct VersionChain {
    current: StoredEvent,
    previous: VecDeque<StoredEvent>,
}

impl VersionChain {
    /// Create a chain holding only the initial version
    pub fn new(initial: StoredEvent) -> Self {
        Self {
            current: initial,
            previous: VecDeque::new(),
        }
    }

    /// Current state
    #[inline]
    pub fn latest(&self) -> &StoredEvent {
        &self.current
    }

    /// Install a newer version, keeping at most `depth` prior versions
    pub fn push(&mut self, next: StoredEvent, depth: usize) {
        debug_assert!(next.version() > self.current.version());
        let prior = std::mem::replace(&mut self.current, next);
        if depth > 0 {
            self.previous.push_front(prior);
        }
        self.previous.truncate(depth);
    }

    /// Versions newest first, optionally limited
    pub fn history(&self, limit: Option<usize>) -> Vec<StoredEvent> {
        let all = std::iter::once(&self.current).chain(self.previous.iter());
        match limit {
            Some(n) => all.take(n).cloned().collect(),
            None => all.cloned().collect(),
        }
    }
}

/// In-memory `VersionStore` with per-event locking
///
/// # Thread Safety
///
/// - get(): shard read guard, then the event's mutex
/// - compare_and_swap(): locks only the target event; the commit hook runs
///   under that lock
/// - create(): locks one map shard and the project's index entry while
///   holding the new event's lock
///
/// # Example
///
/// ```ignore
/// use eventsync_storage::{ShardedVersionStore, VersionStore, Mutation};
///
/// let store = ShardedVersionStore::new();
/// let created = store.create(project, fields, &actor)?;
/// let updated = store.compare_and_swap(created.event.id, created.version(), Mutation::Tombstone, &actor)?;
/// ```
pub struct ShardedVersionStore {
    events: DashMap<EventId, Arc<Mutex<VersionChain>>>,
    projects: DashMap<ProjectId, BTreeSet<EventId>>,
    next_id: AtomicU64,
    history_depth: usize,
}

impl ShardedVersionStore {
    /// Create an empty store with the default history depth
    pub fn new() -> Self {
        Self::with_history_depth(DEFAULT_HISTORY_DEPTH)
    }

    /// Create an empty store retaining `depth` prior versions per event
    pub fn with_history_depth(depth: usize) -> Self {
        Self {
            events: DashMap::new(),
            projects: DashMap::new(),
            next_id: AtomicU64::new(0),
            history_depth: depth,
        }
    }

    /// Configured history depth
    pub fn history_depth(&self) -> usize {
        self.history_depth
    }

    fn slot(&self, event_id: EventId) -> Result<Arc<Mutex<VersionChain>>> {
        self.events
            .get(&event_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(Error::EventNotFound(event_id))
    }

    fn allocate_id(&self) -> EventId {
        EventId::new(self.next_id.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

impl Default for ShardedVersionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionStore for ShardedVersionStore {
    fn get(&self, event_id: EventId) -> Result<StoredEvent> {
        let slot = self.slot(event_id)?;
        let chain = slot.lock();
        Ok(chain.latest().clone())
    }

    fn create_then(
        &self,
        project_id: ProjectId,
        fields: EventFields,
        actor: &UserId,
        on_commit: &dyn Fn(&StoredEvent),
    ) -> Result<StoredEvent> {
        let id = self.allocate_id();
        let stored = StoredEvent::new(
            Event {
                id,
                project_id,
                title: fields.title,
                date: fields.date,
                version: Version::INITIAL,
                deleted: false,
            },
            actor,
        );

        // Locked before it becomes reachable, so nobody can swap it until the
        // hook has run
        let slot = Arc::new(Mutex::new(VersionChain::new(stored.clone())));
        let chain = slot.lock();
        self.events.insert(id, Arc::clone(&slot));
        self.projects.entry(project_id).or_default().insert(id);
        on_commit(&stored);
        drop(chain);

        debug!(target: "eventsync::store", event_id = %id, project_id = %project_id, "Event created");
        Ok(stored)
    }

    fn compare_and_swap_then(
        &self,
        event_id: EventId,
        expected: Version,
        mutation: Mutation,
        actor: &UserId,
        on_commit: &dyn Fn(&StoredEvent),
    ) -> Result<StoredEvent> {
        let slot = self.slot(event_id)?;
        let mut chain = slot.lock();
        let current = chain.latest();

        // A tombstone is terminal: every later CAS conflicts, even at the
        // tombstone's own version.
        if current.event.deleted || current.version() != expected {
            debug!(
                target: "eventsync::store",
                event_id = %event_id,
                expected = %expected,
                current = %current.version(),
                deleted = current.event.deleted,
                "CAS rejected"
            );
            return Err(Error::version_conflict(expected, current.event.clone()));
        }

        let next_version = current.version().next();
        if next_version == current.version() {
            return Err(Error::internal(format!(
                "version counter exhausted for event {}",
                event_id
            )));
        }

        let mut next = current.event.clone();
        mutation.apply(&mut next);
        next.version = next_version;
        let stored = StoredEvent::new(next, actor);
        chain.push(stored.clone(), self.history_depth);
        on_commit(&stored);
        drop(chain);

        debug!(target: "eventsync::store", event_id = %event_id, version = %next_version, "CAS applied");
        Ok(stored)
    }

    fn list_project(&self, project_id: ProjectId) -> Result<Vec<StoredEvent>> {
        let ids: Vec<EventId> = match self.projects.get(&project_id) {
            Some(index) => index.iter().copied().collect(),
            None => return Ok(Vec::new()),
        };

        let mut events = Vec::with_capacity(ids.len());
        for id in ids {
            let slot = self.slot(id)?;
            let chain = slot.lock();
            if chain.latest().event.is_active() {
                events.push(chain.latest().clone());
            }
        }
        Ok(events)
    }

    fn history(&self, event_id: EventId, limit: Option<usize>) -> Result<Vec<StoredEvent>> {
        let slot = self.slot(event_id)?;
        let chain = slot.lock();
        Ok(chain.history(limit))
    }

    fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fields(title: &str) -> EventFields {
        EventFields {
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        }
    }

    fn alice() -> UserId {
        UserId::new("alice")
    }

    #[test]
    fn test_create_starts_at_version_one() {
        let store = ShardedVersionStore::new();
        let created = store
            .create(ProjectId::new(1), fields("standup"), &alice())
            .unwrap();
        assert_eq!(created.version(), Version::INITIAL);
        assert!(!created.event.deleted);
        assert_eq!(created.updated_by, alice());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ids_are_unique_across_projects() {
        let store = ShardedVersionStore::new();
        let a = store.create(ProjectId::new(1), fields("a"), &alice()).unwrap();
        let b = store.create(ProjectId::new(2), fields("b"), &alice()).unwrap();
        assert_ne!(a.event.id, b.event.id);
    }

    #[test]
    fn test_get_unknown_event() {
        let store = ShardedVersionStore::new();
        let err = store.get(EventId::new(99)).unwrap_err();
        assert_eq!(err, Error::EventNotFound(EventId::new(99)));
    }

    #[test]
    fn test_cas_success_bumps_version() {
        let store = ShardedVersionStore::new();
        let created = store
            .create(ProjectId::new(1), fields("standup"), &alice())
            .unwrap();
        let updated = store
            .compare_and_swap(
                created.event.id,
                Version::INITIAL,
                Mutation::Edit(fields("standup (moved)")),
                &UserId::new("bob"),
            )
            .unwrap();
        assert_eq!(updated.version(), Version::new(2));
        assert_eq!(updated.event.title, "standup (moved)");
        assert_eq!(updated.updated_by, UserId::new("bob"));
        assert_eq!(store.get(created.event.id).unwrap(), updated);
    }

    #[test]
    fn test_cas_stale_version_conflicts_with_current_state() {
        let store = ShardedVersionStore::new();
        let created = store
            .create(ProjectId::new(1), fields("standup"), &alice())
            .unwrap();
        let id = created.event.id;
        store
            .compare_and_swap(id, Version::INITIAL, Mutation::Edit(fields("v2")), &alice())
            .unwrap();

        let err = store
            .compare_and_swap(id, Version::INITIAL, Mutation::Edit(fields("stale")), &alice())
            .unwrap_err();
        match err {
            Error::VersionConflict { expected, current } => {
                assert_eq!(expected, Version::INITIAL);
                assert_eq!(current.version, Version::new(2));
                assert_eq!(current.title, "v2");
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(store.get(id).unwrap().event.title, "v2");
    }

    #[test]
    fn test_tombstone_is_terminal() {
        let store = ShardedVersionStore::new();
        let created = store
            .create(ProjectId::new(1), fields("standup"), &alice())
            .unwrap();
        let id = created.event.id;
        let deleted = store
            .compare_and_swap(id, Version::INITIAL, Mutation::Tombstone, &alice())
            .unwrap();
        assert!(deleted.event.deleted);
        assert_eq!(deleted.version(), Version::new(2));

        for version in [Version::INITIAL, Version::new(2), Version::new(3)] {
            let err = store
                .compare_and_swap(id, version, Mutation::Tombstone, &alice())
                .unwrap_err();
            assert!(matches!(err, Error::VersionConflict { .. }));
            let err = store
                .compare_and_swap(id, version, Mutation::Edit(fields("zombie")), &alice())
                .unwrap_err();
            assert!(matches!(err, Error::VersionConflict { .. }));
        }
        assert_eq!(store.get(id).unwrap().version(), Version::new(2));
    }

    #[test]
    fn test_commit_hook_runs_only_for_accepted_writes() {
        let store = ShardedVersionStore::new();
        let seen = Mutex::new(Vec::new());
        let record = |stored: &StoredEvent| seen.lock().push(stored.version().as_u64());

        let created = store
            .create_then(ProjectId::new(1), fields("standup"), &alice(), &record)
            .unwrap();
        let id = created.event.id;
        store
            .compare_and_swap_then(id, Version::INITIAL, Mutation::Edit(fields("v2")), &alice(), &record)
            .unwrap();
        assert!(store
            .compare_and_swap_then(id, Version::INITIAL, Mutation::Tombstone, &alice(), &record)
            .is_err());

        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn test_commit_hook_sees_event_locked() {
        let store = ShardedVersionStore::new();
        let created = store
            .create(ProjectId::new(1), fields("standup"), &alice())
            .unwrap();
        let id = created.event.id;

        // The slot is still held while the hook runs
        store
            .compare_and_swap_then(id, Version::INITIAL, Mutation::Tombstone, &alice(), &|_| {
                let slot = store.slot(id).unwrap();
                assert!(slot.try_lock().is_none());
            })
            .unwrap();
        assert!(store.slot(id).unwrap().try_lock().is_some());
    }

    #[test]
    fn test_list_project_skips_tombstones_and_other_projects() {
        let store = ShardedVersionStore::new();
        let p = ProjectId::new(1);
        let a = store.create(p, fields("a"), &alice()).unwrap();
        let b = store.create(p, fields("b"), &alice()).unwrap();
        store.create(ProjectId::new(2), fields("other"), &alice()).unwrap();
        store
            .compare_and_swap(a.event.id, Version::INITIAL, Mutation::Tombstone, &alice())
            .unwrap();

        let listed = store.list_project(p).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].event.id, b.event.id);
        assert!(store.list_project(ProjectId::new(3)).unwrap().is_empty());
    }

    #[test]
    fn test_history_is_bounded_and_newest_first() {
        let store = ShardedVersionStore::with_history_depth(2);
        let created = store
            .create(ProjectId::new(1), fields("t1"), &alice())
            .unwrap();
        let id = created.event.id;
        let mut version = Version::INITIAL;
        for title in ["t2", "t3", "t4"] {
            version = store
                .compare_and_swap(id, version, Mutation::Edit(fields(title)), &alice())
                .unwrap()
                .version();
        }

        let history = store.history(id, None).unwrap();
        let versions: Vec<u64> = history.iter().map(|s| s.version().as_u64()).collect();
        assert_eq!(versions, vec![4, 3, 2]);
        assert_eq!(store.history(id, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_chain_with_zero_depth_keeps_only_current() {
        let store = ShardedVersionStore::with_history_depth(0);
        let created = store
            .create(ProjectId::new(1), fields("t1"), &alice())
            .unwrap();
        store
            .compare_and_swap(created.event.id, Version::INITIAL, Mutation::Edit(fields("t2")), &alice())
            .unwrap();
        let history = store.history(created.event.id, None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event.title, "t2");
    }

    #[test]
    fn test_stored_event_json_flattens_event() {
        let store = ShardedVersionStore::new();
        let created = store
            .create(ProjectId::new(5), fields("standup"), &alice())
            .unwrap();
        let value = serde_json::to_value(&created).unwrap();
        assert_eq!(value["title"], "standup");
        assert_eq!(value["version"], 1);
        assert_eq!(value["updated_by"], "alice");
        assert!(value.get("deleted").is_none());
    }
}
