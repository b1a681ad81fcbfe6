//! Conflict-aware mutation engine
//!
//! Every mutation follows the same order:
//!
//! 1. Authorize the actor against the project
//! 2. Validate input
//! 3. Reserve the request id (creates only)
//! 4. Apply the change to the version store and publish the change record
//!    while the event is still locked
//! 5. Commit the reservation
//!
//! A change record is only ever published after the store accepted the
//! mutation, and a replayed create publishes nothing. Publishing under the
//! event's lock keeps each event's records in version order on every
//! subscription. Updates and deletes are
//! not deduplicated: a stale double submit fails its compare-and-swap and
//! surfaces as a version conflict.

use std::sync::Arc;

use eventsync_concurrency::{Fingerprint, IdempotencyLedger, LedgerConfig, Reserve};
use eventsync_core::{
    ChangeKind, ChangeRecord, Error, Event, EventFields, EventId, Limits, ProjectId, RequestId,
    Result, Timestamp, UserId, Version,
};
use eventsync_storage::{Mutation, ShardedVersionStore, StoredEvent, VersionStore};
use tracing::{debug, info};

use crate::access::{AccessDirectory, StaticDirectory};
use crate::config::EventsyncConfig;
use crate::hub::{HubConfig, NotificationHub, PublishReport, Subscription};

/// Coordinates the version store, idempotency ledger and notification hub
pub struct MutationEngine {
    store: Arc<dyn VersionStore>,
    ledger: IdempotencyLedger<Event>,
    hub: NotificationHub,
    directory: Arc<dyn AccessDirectory>,
    limits: Limits,
}

impl MutationEngine {
    /// Assemble an engine from its collaborators
    pub fn new(
        store: Arc<dyn VersionStore>,
        directory: Arc<dyn AccessDirectory>,
        ledger: LedgerConfig,
        hub: HubConfig,
        limits: Limits,
    ) -> Self {
        Self {
            store,
            ledger: IdempotencyLedger::new(ledger),
            hub: NotificationHub::new(hub),
            directory,
            limits,
        }
    }

    /// Build an in-memory engine from configuration
    pub fn from_config(config: &EventsyncConfig) -> Self {
        let store = ShardedVersionStore::with_history_depth(config.store.history_depth);
        let directory = StaticDirectory::from_entries(config.sessions(), config.memberships());
        Self::new(
            Arc::new(store),
            Arc::new(directory),
            config.ledger_config(),
            config.hub_config(),
            config.limits(),
        )
    }

    /// Notification hub
    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// Idempotency ledger
    pub fn ledger(&self) -> &IdempotencyLedger<Event> {
        &self.ledger
    }

    /// Version store
    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    /// Resolve a session token; a missing token is `Unauthenticated`
    pub fn authenticate(&self, token: Option<&str>) -> Result<UserId> {
        match token {
            Some(token) if !token.is_empty() => self.directory.authenticate(token),
            _ => Err(Error::Unauthenticated),
        }
    }

    /// Check project membership
    pub fn authorize(&self, actor: &UserId, project_id: ProjectId) -> Result<()> {
        self.directory.authorize(actor, project_id)
    }

    /// Create an event
    ///
    /// With a request id the create is applied at most once: repeating the
    /// same request returns the original event, and reusing the id for a
    /// different request fails with `RequestIdReuseMismatch`.
    pub async fn create_event(
        &self,
        project_id: ProjectId,
        title: &str,
        date: &str,
        request_id: Option<RequestId>,
        actor: &UserId,
    ) -> Result<Event> {
        self.authorize(actor, project_id)?;
        let fields = self.limits.validate_fields(title, date)?;

        let Some(request_id) = request_id else {
            return self.apply_create(project_id, fields, actor);
        };

        let fingerprint = create_fingerprint(project_id, &fields, actor);
        match self.ledger.check_or_reserve(request_id, fingerprint).await? {
            Reserve::Replay(event) => {
                info!(
                    target: "eventsync::engine",
                    request_id = %request_id,
                    event_id = %event.id,
                    "Replayed create"
                );
                Ok(event)
            }
            Reserve::Fresh(reservation) => {
                // An error here drops the reservation, which frees the id
                let event = self
                    .store
                    .create_then(
                        project_id,
                        fields,
                        actor,
                        &self.publish_on_commit(ChangeKind::EventCreated),
                    )?
                    .into_event();
                reservation.commit(event.clone());
                info!(
                    target: "eventsync::engine",
                    request_id = %request_id,
                    event_id = %event.id,
                    project_id = %project_id,
                    actor = %actor,
                    "Created event"
                );
                Ok(event)
            }
        }
    }

    fn apply_create(
        &self,
        project_id: ProjectId,
        fields: EventFields,
        actor: &UserId,
    ) -> Result<Event> {
        let event = self
            .store
            .create_then(
                project_id,
                fields,
                actor,
                &self.publish_on_commit(ChangeKind::EventCreated),
            )?
            .into_event();
        info!(
            target: "eventsync::engine",
            event_id = %event.id,
            project_id = %project_id,
            actor = %actor,
            "Created event"
        );
        Ok(event)
    }

    /// Replace an event's title and date if it is still at `expected_version`
    pub fn update_event(
        &self,
        project_id: ProjectId,
        event_id: EventId,
        title: &str,
        date: &str,
        expected_version: Version,
        actor: &UserId,
    ) -> Result<Event> {
        self.authorize(actor, project_id)?;
        let fields = self.limits.validate_fields(title, date)?;
        self.load_in_project(project_id, event_id)?;

        let event = self
            .store
            .compare_and_swap_then(
                event_id,
                expected_version,
                Mutation::Edit(fields),
                actor,
                &self.publish_on_commit(ChangeKind::EventUpdated),
            )
            .map_err(|e| log_conflict(e, event_id, actor))?
            .into_event();
        info!(
            target: "eventsync::engine",
            event_id = %event_id,
            version = %event.version,
            actor = %actor,
            "Updated event"
        );
        Ok(event)
    }

    /// Tombstone an event
    ///
    /// `None` deletes whatever version is currently stored; a concurrent
    /// change between the read and the swap still surfaces as a conflict.
    pub fn delete_event(
        &self,
        project_id: ProjectId,
        event_id: EventId,
        expected_version: Option<Version>,
        actor: &UserId,
    ) -> Result<Event> {
        self.authorize(actor, project_id)?;
        let current = self.load_in_project(project_id, event_id)?;
        let expected = expected_version.unwrap_or_else(|| current.version());

        let event = self
            .store
            .compare_and_swap_then(
                event_id,
                expected,
                Mutation::Tombstone,
                actor,
                &self.publish_on_commit(ChangeKind::EventDeleted),
            )
            .map_err(|e| log_conflict(e, event_id, actor))?
            .into_event();
        info!(
            target: "eventsync::engine",
            event_id = %event_id,
            version = %event.version,
            actor = %actor,
            "Deleted event"
        );
        Ok(event)
    }

    /// Live (non-deleted) events of a project, ordered by id
    pub fn list_events(&self, project_id: ProjectId, actor: &UserId) -> Result<Vec<Event>> {
        self.authorize(actor, project_id)?;
        Ok(self
            .store
            .list_project(project_id)?
            .into_iter()
            .map(StoredEvent::into_event)
            .collect())
    }

    /// Current state of one event, tombstones included
    pub fn get_event(
        &self,
        project_id: ProjectId,
        event_id: EventId,
        actor: &UserId,
    ) -> Result<Event> {
        self.authorize(actor, project_id)?;
        Ok(self.load_in_project(project_id, event_id)?.into_event())
    }

    /// Retained versions of one event, newest first
    pub fn event_history(
        &self,
        project_id: ProjectId,
        event_id: EventId,
        actor: &UserId,
    ) -> Result<Vec<StoredEvent>> {
        self.authorize(actor, project_id)?;
        self.load_in_project(project_id, event_id)?;
        self.store.history(event_id, None)
    }

    /// Open a live change stream for a project
    pub fn subscribe(&self, project_id: ProjectId, token: Option<&str>) -> Result<Subscription> {
        let actor = self.authenticate(token)?;
        self.authorize(&actor, project_id)?;
        let subscription = self.hub.subscribe(project_id)?;
        info!(target: "eventsync::engine", project_id = %project_id, actor = %actor, "Subscriber connected");
        Ok(subscription)
    }

    /// Remove request ids whose retention ended at or before `now`
    pub fn purge_expired(&self, now: Timestamp) -> usize {
        self.ledger.purge_expired(now)
    }

    fn load_in_project(&self, project_id: ProjectId, event_id: EventId) -> Result<StoredEvent> {
        let stored = self.store.get(event_id)?;
        if stored.event.project_id != project_id {
            return Err(Error::EventNotFound(event_id));
        }
        Ok(stored)
    }

    fn publish(&self, kind: ChangeKind, event: &Event) -> PublishReport {
        self.hub.publish(ChangeRecord::new(kind, event.clone()))
    }

    /// Commit hook for the store; runs while the event is still locked
    fn publish_on_commit(&self, kind: ChangeKind) -> impl Fn(&StoredEvent) + '_ {
        move |stored: &StoredEvent| {
            self.publish(kind, &stored.event);
        }
    }
}

impl std::fmt::Debug for MutationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationEngine")
            .field("events", &self.store.len())
            .field("ledger_entries", &self.ledger.len())
            .field("hub", &self.hub)
            .field("limits", &self.limits)
            .finish()
    }
}

fn create_fingerprint(project_id: ProjectId, fields: &EventFields, actor: &UserId) -> Fingerprint {
    let date = fields.date.to_string();
    Fingerprint::from_parts(&[
        &project_id.as_u64().to_be_bytes(),
        fields.title.as_bytes(),
        date.as_bytes(),
        actor.as_str().as_bytes(),
    ])
}

fn log_conflict(error: Error, event_id: EventId, actor: &UserId) -> Error {
    if let Error::VersionConflict { expected, current } = &error {
        debug!(
            target: "eventsync::engine",
            event_id = %event_id,
            expected = %expected,
            current = %current.version,
            actor = %actor,
            "Version conflict"
        );
    }
    error
}
