//! Shared handler state

use std::sync::Arc;

use eventsync_engine::MutationEngine;

/// State cloned into every handler
#[derive(Debug, Clone)]
pub struct AppState {
    /// The mutation engine behind every route
    pub engine: Arc<MutationEngine>,
}

impl AppState {
    /// Wrap an engine
    pub fn new(engine: Arc<MutationEngine>) -> Self {
        Self { engine }
    }
}
