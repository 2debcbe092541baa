//! Liveness check reporting the size of the session store.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Sessions held by the provider, expired-but-unswept ones included.
    pub sessions: usize,
}

/// Report liveness without touching the caller's session or cookies.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.sessions.provider().session_count(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
