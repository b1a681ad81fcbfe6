//! Storage-layer event wrapper
//!
//! The contract type `Event` carries what clients see. `StoredEvent` adds the
//! bookkeeping the store keeps per version: when it was written and by whom.

use eventsync_core::{Event, EventFields, Timestamp, UserId, Version};
use serde::{Deserialize, Serialize};

/// One stored version of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Event state at this version
    #[serde(flatten)]
    pub event: Event,
    /// When this version was written
    pub updated_at: Timestamp,
    /// Member whose mutation produced this version
    pub updated_by: UserId,
}

impl StoredEvent {
    /// Wrap an event state written now by `actor`
    pub fn new(event: Event, actor: &UserId) -> Self {
        StoredEvent {
            event,
            updated_at: Timestamp::now(),
            updated_by: actor.clone(),
        }
    }

    /// Version of this stored state
    #[inline]
    pub fn version(&self) -> Version {
        self.event.version
    }

    /// Consume and return the contract event
    #[inline]
    pub fn into_event(self) -> Event {
        self.event
    }
}

/// A state transition applied under compare-and-swap
///
/// The store bumps the version itself; a mutation only edits content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Replace title and date
    Edit(EventFields),
    /// Mark the event deleted
    Tombstone,
}

impl Mutation {
    /// Apply the content change to `event`
    pub fn apply(&self, event: &mut Event) {
        match self {
            Mutation::Edit(fields) => {
                event.title = fields.title.clone();
                event.date = fields.date;
            }
            Mutation::Tombstone => event.deleted = true,
        }
    }
}
