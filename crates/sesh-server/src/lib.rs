//! HTTP front end for sesh sessions.
//!
//! Adapts the session [`Manager`](sesh_session::Manager) to axum: an
//! [`HttpTransport`] carries the session cookie over request and response
//! headers, and a small counter application shows the lifecycle end to end.
//!
//! # Routes
//!
//! - `GET /health`: liveness and version
//! - `GET /count`: increment the caller's visit counter
//! - `GET /session`: inspect the caller's session
//! - `POST /logout`: end the caller's session
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sesh_server::{Server, ServerConfig};
//! use sesh_session::{Manager, ManagerConfig, ProviderRegistry, MEMORY_PROVIDER};
//!
//! let registry = ProviderRegistry::with_defaults();
//! let manager = Manager::new(&registry, MEMORY_PROVIDER, ManagerConfig::new())?;
//! let config = ServerConfig::new().with_bind_address("127.0.0.1:8080".parse()?);
//!
//! Server::new(Arc::new(manager), config).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;
pub mod transport;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use logging::request_logging_middleware;
pub use routes::{COUNT_KEY, HealthResponse, SessionInfo};
pub use state::{AppState, CounterManager};
pub use transport::HttpTransport;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The sesh demo HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server around an existing session manager.
    pub fn new(sessions: Arc<CounterManager>, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(sessions, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .route("/count", get(routes::count_handler))
            .route("/session", get(routes::session_handler))
            .route("/logout", post(routes::logout_handler))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until the process is killed.
    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run the server on the configured address until `signal` resolves.
    pub async fn run_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        self.serve(listener, signal).await
    }

    /// Serve on an already-bound listener until `signal` resolves.
    ///
    /// The session GC task runs for exactly as long as the listener does.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Listener has no address: {}", e)))?;
        let router = self.router();
        let gc = self.state.sessions.run_gc();

        info!(%addr, cookie_name = self.state.sessions.cookie_name(), "Starting server");

        let result = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)));

        gc.shutdown().await;
        info!("Server stopped");
        result
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }

    /// Shared application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}
