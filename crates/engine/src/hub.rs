//! Project notification hub
//!
//! Fans change records out to every live subscription of a project. Each
//! subscription owns a bounded tokio channel; `publish` only ever calls
//! `try_send`, so one slow socket cannot stall a mutation or delay delivery to
//! the others. A subscriber whose queue is full is removed and its stream
//! ends, which closes the socket. Missed records are not replayed; a client
//! that reconnects re-fetches the event list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use eventsync_core::{ChangeRecord, Error, ProjectId, Result};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Default per-subscription queue length
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Default live subscriptions per project
pub const DEFAULT_MAX_SUBSCRIBERS_PER_PROJECT: usize = 256;

/// Hub tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Records buffered per subscription before it is dropped as lagging
    pub outbound_queue: usize,
    /// Live subscriptions allowed per project
    pub max_subscribers_per_project: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            max_subscribers_per_project: DEFAULT_MAX_SUBSCRIBERS_PER_PROJECT,
        }
    }
}

/// Why the hub removed a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The outbound queue was full
    SubscriberLagged,
}

/// Outcome of one `publish`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscriptions the record was queued for
    pub delivered: usize,
    /// Subscriptions removed during this publish (lagging or closed)
    pub dropped: usize,
}

type SubscriberId = u64;

struct Subscriber {
    sender: mpsc::Sender<Arc<ChangeRecord>>,
    drop_reason: Arc<Mutex<Option<DropReason>>>,
}

struct HubState {
    projects: DashMap<ProjectId, HashMap<SubscriberId, Subscriber>>,
    next_subscriber_id: AtomicU64,
    config: HubConfig,
}

impl HubState {
    fn remove(&self, project_id: ProjectId, id: SubscriberId) {
        if let Some(mut subscribers) = self.projects.get_mut(&project_id) {
            subscribers.remove(&id);
        }
        self.projects
            .remove_if(&project_id, |_, subscribers| subscribers.is_empty());
    }
}

/// Registry of live subscriptions keyed by project
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubState>,
}

impl NotificationHub {
    /// Create an empty hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            inner: Arc::new(HubState {
                projects: DashMap::new(),
                next_subscriber_id: AtomicU64::new(1),
                config,
            }),
        }
    }

    /// Hub configuration
    pub fn config(&self) -> HubConfig {
        self.inner.config
    }

    /// Register a subscription for `project_id`
    ///
    /// Callers authorize the connection first; the hub only enforces the
    /// per-project cap.
    pub fn subscribe(&self, project_id: ProjectId) -> Result<Subscription> {
        let config = self.inner.config;
        let mut subscribers = self.inner.projects.entry(project_id).or_default();
        if subscribers.len() >= config.max_subscribers_per_project {
            warn!(
                target: "eventsync::hub",
                project_id = %project_id,
                max = config.max_subscribers_per_project,
                "Subscription rejected: project at capacity"
            );
            return Err(Error::SubscriberLimitReached {
                project: project_id,
                max: config.max_subscribers_per_project,
            });
        }

        let (sender, receiver) = mpsc::channel(config.outbound_queue);
        let drop_reason = Arc::new(Mutex::new(None));
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        subscribers.insert(
            id,
            Subscriber {
                sender,
                drop_reason: Arc::clone(&drop_reason),
            },
        );
        let live = subscribers.len();
        drop(subscribers);

        debug!(target: "eventsync::hub", project_id = %project_id, subscriber = id, live, "Subscribed");
        Ok(Subscription {
            hub: Arc::clone(&self.inner),
            project_id,
            id,
            receiver,
            drop_reason,
        })
    }

    /// Queue `record` for every live subscription of its project
    ///
    /// Never blocks. Subscriptions with a full queue or a closed receiver are
    /// removed.
    pub fn publish(&self, record: ChangeRecord) -> PublishReport {
        let project_id = record.project_id;
        let kind = record.kind;
        let record = Arc::new(record);
        let mut report = PublishReport::default();

        let Some(mut subscribers) = self.inner.projects.get_mut(&project_id) else {
            return report;
        };

        let mut dropped = Vec::new();
        for (id, subscriber) in subscribers.iter() {
            match subscriber.sender.try_send(Arc::clone(&record)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    *subscriber.drop_reason.lock() = Some(DropReason::SubscriberLagged);
                    warn!(
                        target: "eventsync::hub",
                        project_id = %project_id,
                        subscriber = id,
                        "Dropping lagging subscriber"
                    );
                    dropped.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(target: "eventsync::hub", project_id = %project_id, subscriber = id, "Removing closed subscriber");
                    dropped.push(*id);
                }
            }
        }
        for id in &dropped {
            subscribers.remove(id);
        }
        report.dropped = dropped.len();
        drop(subscribers);

        if report.dropped > 0 {
            self.inner
                .projects
                .remove_if(&project_id, |_, subscribers| subscribers.is_empty());
        }

        debug!(
            target: "eventsync::hub",
            project_id = %project_id,
            kind = kind.as_str(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Published"
        );
        report
    }

    /// Live subscriptions for `project_id`
    pub fn subscriber_count(&self, project_id: ProjectId) -> usize {
        self.inner
            .projects
            .get(&project_id)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Live subscriptions across all projects
    pub fn total_subscribers(&self) -> usize {
        self.inner
            .projects
            .iter()
            .map(|entry| entry.value().len())
            .sum()
    }
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("config", &self.inner.config)
            .field("subscribers", &self.total_subscribers())
            .finish()
    }
}

/// A live connection's view of its project's change stream
///
/// Dropping it unsubscribes.
pub struct Subscription {
    hub: Arc<HubState>,
    project_id: ProjectId,
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<ChangeRecord>>,
    drop_reason: Arc<Mutex<Option<DropReason>>>,
}

impl Subscription {
    /// Project this subscription follows
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Next record, or `None` once the hub dropped this subscription and the
    /// queue is drained
    pub async fn recv(&mut self) -> Option<Arc<ChangeRecord>> {
        self.receiver.recv().await
    }

    /// Next record if one is already queued
    pub fn try_recv(&mut self) -> Option<Arc<ChangeRecord>> {
        self.receiver.try_recv().ok()
    }

    /// Set when the hub removed this subscription for lagging
    pub fn drop_reason(&self) -> Option<DropReason> {
        *self.drop_reason.lock()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.remove(self.project_id, self.id);
        debug!(target: "eventsync::hub", project_id = %self.project_id, subscriber = self.id, "Unsubscribed");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("project_id", &self.project_id)
            .field("id", &self.id)
            .finish()
    }
}
