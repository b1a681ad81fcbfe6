//! Route table and server entry point

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use eventsync_engine::MutationEngine;
use tokio::net::TcpListener;
use tracing::info;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the HTTP and WebSocket routes over `engine`
pub fn build_router(engine: Arc<MutationEngine>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/projects/:project_id/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route(
            "/projects/:project_id/events/:event_id",
            get(handlers::get_event)
                .put(handlers::update_event)
                .delete(handlers::delete_event),
        )
        .route(
            "/projects/:project_id/events/:event_id/history",
            get(handlers::event_history),
        )
        .route("/ws/projects/:project_id", get(ws::subscribe))
        .with_state(AppState::new(engine))
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    engine: Arc<MutationEngine>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(target: "eventsync::api", %addr, "Listening");
    }
    axum::serve(listener, build_router(engine))
        .with_graceful_shutdown(shutdown)
        .await
}
