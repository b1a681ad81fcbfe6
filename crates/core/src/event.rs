//! Scheduled events and the change records broadcast when they mutate

use crate::types::{EventId, ProjectId};
use crate::Version;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A scheduled event in a project
///
/// `deleted` is a tombstone flag: deleting an event bumps its version and
/// keeps it in the store so late conflict checks stay well defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Store-allocated identifier
    pub id: EventId,
    /// Owning project
    pub project_id: ProjectId,
    /// Display title
    pub title: String,
    /// Calendar date, rendered as `YYYY-MM-DD`
    pub date: NaiveDate,
    /// Mutation counter, 1 on creation
    pub version: Version,
    /// Tombstone flag; omitted from JSON while false
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Event {
    /// Whether the event is still live
    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}

/// Validated user-editable fields of an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFields {
    /// Trimmed, non-empty title
    pub title: String,
    /// Calendar date
    pub date: NaiveDate,
}

/// Kind of change broadcast to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// An event was created
    EventCreated,
    /// An event's title or date changed
    EventUpdated,
    /// An event was tombstoned
    EventDeleted,
}

impl ChangeKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::EventCreated => "event_created",
            ChangeKind::EventUpdated => "event_updated",
            ChangeKind::EventDeleted => "event_deleted",
        }
    }
}

/// Unit of fan-out: one per accepted mutation, never stored
///
/// Serializes as `{"type": "event_created", "project_id": 1, "event": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// What happened
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Project whose subscribers receive the record
    pub project_id: ProjectId,
    /// Event state after the mutation
    pub event: Event,
}

impl ChangeRecord {
    /// Build a record for the given post-mutation event state
    pub fn new(kind: ChangeKind, event: Event) -> Self {
        Self {
            kind,
            project_id: event.project_id,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn standup() -> Event {
        Event {
            id: EventId::new(1),
            project_id: ProjectId::new(10),
            title: "standup".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            version: Version::INITIAL,
            deleted: false,
        }
    }

    #[test]
    fn test_active_event_json_shape() {
        let value = serde_json::to_value(standup()).unwrap();
        assert_eq!(
            value,
            json!({"id": 1, "project_id": 10, "title": "standup", "date": "2024-01-10", "version": 1})
        );
    }

    #[test]
    fn test_tombstone_json_includes_deleted_flag() {
        let mut event = standup();
        event.deleted = true;
        event.version = Version::new(2);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["deleted"], json!(true));
        assert!(!event.is_active());
    }

    #[test]
    fn test_change_record_wire_format() {
        let record = ChangeRecord::new(ChangeKind::EventCreated, standup());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], json!("event_created"));
        assert_eq!(value["project_id"], json!(10));
        assert_eq!(value["event"]["title"], json!("standup"));
    }

    #[test]
    fn test_change_kind_names_match_serde() {
        for kind in [
            ChangeKind::EventCreated,
            ChangeKind::EventUpdated,
            ChangeKind::EventDeleted,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, json!(kind.as_str()));
        }
    }
}
