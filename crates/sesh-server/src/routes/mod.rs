//! HTTP routes.

mod count;
mod health;

pub use count::{COUNT_KEY, SessionInfo, count_handler, logout_handler, session_handler};
pub use health::{HealthResponse, health, health_routes};
