//! Visit counter backed by the session store.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::AppState;
use crate::transport::HttpTransport;

/// Session key holding the visit count.
pub const COUNT_KEY: &str = "countnum";

/// Snapshot of the caller's session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub count: Option<i64>,
    pub entries: usize,
}

/// Increment the caller's counter and return the new value.
///
/// The first visit starts a session and sets its cookie.
pub async fn count_handler(
    State(state): State<AppState>,
    mut transport: HttpTransport,
) -> Result<(HttpTransport, String)> {
    let session = state.sessions.start_session(&mut transport)?;
    let count = session.update(COUNT_KEY, |current| current.map_or(1, |n| n + 1));
    Ok((transport, count.to_string()))
}

/// Describe the caller's session without changing its data.
pub async fn session_handler(
    State(state): State<AppState>,
    mut transport: HttpTransport,
) -> Result<(HttpTransport, Json<SessionInfo>)> {
    let session = state.sessions.start_session(&mut transport)?;
    let info = SessionInfo {
        id: session.id().to_string(),
        count: session.get(COUNT_KEY),
        entries: session.len(),
    };
    Ok((transport, Json(info)))
}

/// End the caller's session and clear its cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    mut transport: HttpTransport,
) -> Result<(HttpTransport, StatusCode)> {
    state.sessions.destroy_session(&mut transport)?;
    Ok((transport, StatusCode::NO_CONTENT))
}
