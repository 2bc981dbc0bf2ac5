use std::sync::Arc;

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use services::session::SessionManager;

// Application state
pub struct AppState {
    pub config: config::Config,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        Self {
            config,
            sessions: SessionManager::new(),
        }
    }
}

/// Builds the HTTP application around a shared state.
pub fn app(state: Arc<AppState>) -> axum::Router {
    routes::router(Arc::clone(&state)).with_state(state)
}
