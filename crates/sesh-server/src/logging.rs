//! Request logging middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;

use crate::state::AppState;

/// Log method, path, status and latency for each request.
///
/// Server errors log at `error`, client errors at `warn`, the rest at `info`.
/// Disabled by `ServerConfig::request_logging`.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(%method, %path, status = status.as_u16(), duration_ms, "Request failed");
    } else if status.is_client_error() {
        tracing::warn!(%method, %path, status = status.as_u16(), duration_ms, "Request rejected");
    } else {
        tracing::info!(%method, %path, status = status.as_u16(), duration_ms, "Request completed");
    }

    response
}
