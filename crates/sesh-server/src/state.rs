//! Application state shared across handlers.

use std::sync::Arc;

use sesh_session::Manager;

use crate::config::ServerConfig;

/// Session values stored by the demo routes.
pub type CounterManager = Manager<i64>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session manager owning the cookie policy and provider.
    pub sessions: Arc<CounterManager>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(sessions: Arc<CounterManager>, config: ServerConfig) -> Self {
        Self {
            sessions,
            config: Arc::new(config),
        }
    }
}
