//! WebSocket change stream
//!
//! `GET /ws/projects/{id}?token=` subscribes before the upgrade, so a bad
//! token, a non-member or a full project is answered with a plain HTTP error
//! and no socket is ever opened. Once upgraded, the socket forwards every
//! change record of the project as a JSON text frame. Inbound frames other
//! than Close are ignored.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use eventsync_core::{Error, ProjectId};
use eventsync_engine::Subscription;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Handshake query parameters
#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    /// Session token
    pub token: Option<String>,
}

/// `GET /ws/projects/{id}`
pub async fn subscribe(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Query(params): Query<SocketParams>,
    upgrade: Option<WebSocketUpgrade>,
) -> ApiResult<Response> {
    let project_id = project
        .parse::<u64>()
        .map(ProjectId::new)
        .map_err(|_| Error::invalid_input("project_id", "must be a non-negative integer"))?;

    let subscription = state
        .engine
        .subscribe(project_id, params.token.as_deref())?;
    let upgrade = upgrade.ok_or(ApiError::UpgradeRequired)?;

    Ok(upgrade.on_upgrade(move |socket| forward_changes(socket, subscription)))
}

async fn forward_changes(mut socket: WebSocket, mut subscription: Subscription) {
    let project_id = subscription.project_id();
    info!(target: "eventsync::api", project_id = %project_id, "Socket opened");

    loop {
        tokio::select! {
            record = subscription.recv() => {
                let Some(record) = record else {
                    // The hub dropped this subscription for lagging
                    let frame = CloseFrame {
                        code: close_code::AGAIN,
                        reason: "subscriber lagged; reload and reconnect".into(),
                    };
                    let _ = socket.send(Message::Close(Some(frame))).await;
                    warn!(target: "eventsync::api", project_id = %project_id, "Closed lagging socket");
                    break;
                };
                let text = match serde_json::to_string(&*record) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(target: "eventsync::api", project_id = %project_id, error = %e, "Failed to encode change record");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => debug!(target: "eventsync::api", project_id = %project_id, "Ignoring inbound frame"),
            },
        }
    }

    info!(target: "eventsync::api", project_id = %project_id, "Socket closed");
}
