//! REST handlers
//!
//! # Endpoints
//!
//! - `POST /projects/{id}/events?title=&date=&request_id=` - create (201)
//! - `PUT /projects/{id}/events/{eventId}?title=&date=&version=` - update
//! - `DELETE /projects/{id}/events/{eventId}[?version=]` - tombstone
//! - `GET /projects/{id}/events` - live events
//! - `GET /projects/{id}/events/{eventId}` - one event, tombstones included
//! - `GET /projects/{id}/events/{eventId}/history` - retained versions
//! - `GET /health`

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use eventsync_core::{Error, Event, EventId, ProjectId, RequestId, Version};
use eventsync_storage::StoredEvent;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::Actor;
use crate::error::ApiResult;
use crate::state::AppState;

// =============================================================================
// Parameters
// =============================================================================

/// Query parameters accepted by the event routes
///
/// Everything arrives as a string so malformed values produce the service's
/// own `invalid_input` body.
#[derive(Debug, Default, Deserialize)]
pub struct EventParams {
    /// Event title
    pub title: Option<String>,
    /// Event date, `YYYY-MM-DD`
    pub date: Option<String>,
    /// Idempotency key for creates
    pub request_id: Option<String>,
    /// Expected version for updates and deletes
    pub version: Option<String>,
}

impl EventParams {
    fn required<'a>(field: &str, value: &'a Option<String>) -> ApiResult<&'a str> {
        value
            .as_deref()
            .ok_or_else(|| Error::invalid_input(field, "is required").into())
    }

    fn title(&self) -> ApiResult<&str> {
        Self::required("title", &self.title)
    }

    fn date(&self) -> ApiResult<&str> {
        Self::required("date", &self.date)
    }

    fn request_id(&self) -> ApiResult<Option<RequestId>> {
        match self.request_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => RequestId::from_string(raw)
                .map(Some)
                .ok_or_else(|| Error::invalid_input("request_id", "must be a UUID").into()),
        }
    }

    fn version(&self) -> ApiResult<Option<Version>> {
        match self.version.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            // Any well-formed version is accepted; the store rejects ones
            // that never existed as conflicts
            Some(raw) => raw
                .parse::<u64>()
                .map(|v| Some(Version::new(v)))
                .map_err(|_| {
                    Error::invalid_input("version", "must be a non-negative integer").into()
                }),
        }
    }
}

fn parse_id(field: &str, raw: &str) -> ApiResult<u64> {
    raw.parse::<u64>()
        .map_err(|_| Error::invalid_input(field, "must be a non-negative integer").into())
}

fn project_id(raw: &str) -> ApiResult<ProjectId> {
    parse_id("project_id", raw).map(ProjectId::new)
}

fn event_path(raw: &(String, String)) -> ApiResult<(ProjectId, EventId)> {
    Ok((project_id(&raw.0)?, EventId::new(parse_id("event_id", &raw.1)?)))
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /projects/{id}/events`
pub async fn create_event(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(project): Path<String>,
    Query(params): Query<EventParams>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let project_id = project_id(&project)?;
    debug!(target: "eventsync::api", project_id = %project_id, actor = %actor, "POST event");
    let event = state
        .engine
        .create_event(
            project_id,
            params.title()?,
            params.date()?,
            params.request_id()?,
            &actor,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `PUT /projects/{id}/events/{eventId}`
pub async fn update_event(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(path): Path<(String, String)>,
    Query(params): Query<EventParams>,
) -> ApiResult<Json<Event>> {
    let (project_id, event_id) = event_path(&path)?;
    debug!(target: "eventsync::api", project_id = %project_id, event_id = %event_id, actor = %actor, "PUT event");
    let expected = params
        .version()?
        .ok_or_else(|| Error::invalid_input("version", "is required"))?;
    let event = state.engine.update_event(
        project_id,
        event_id,
        params.title()?,
        params.date()?,
        expected,
        &actor,
    )?;
    Ok(Json(event))
}

/// `DELETE /projects/{id}/events/{eventId}`
pub async fn delete_event(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(path): Path<(String, String)>,
    Query(params): Query<EventParams>,
) -> ApiResult<Json<Event>> {
    let (project_id, event_id) = event_path(&path)?;
    debug!(target: "eventsync::api", project_id = %project_id, event_id = %event_id, actor = %actor, "DELETE event");
    let event = state
        .engine
        .delete_event(project_id, event_id, params.version()?, &actor)?;
    Ok(Json(event))
}

/// `GET /projects/{id}/events`
pub async fn list_events(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(project): Path<String>,
) -> ApiResult<Json<Vec<Event>>> {
    let project_id = project_id(&project)?;
    Ok(Json(state.engine.list_events(project_id, &actor)?))
}

/// `GET /projects/{id}/events/{eventId}`
pub async fn get_event(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(path): Path<(String, String)>,
) -> ApiResult<Json<Event>> {
    let (project_id, event_id) = event_path(&path)?;
    Ok(Json(state.engine.get_event(project_id, event_id, &actor)?))
}

/// `GET /projects/{id}/events/{eventId}/history`
pub async fn event_history(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(path): Path<(String, String)>,
) -> ApiResult<Json<Vec<StoredEvent>>> {
    let (project_id, event_id) = event_path(&path)?;
    Ok(Json(state.engine.event_history(project_id, event_id, &actor)?))
}
