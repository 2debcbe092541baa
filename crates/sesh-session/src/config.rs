//! Configuration for the session manager.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "sesh_id";

/// Default idle time after which a session becomes eligible for eviction.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 60);

/// Shortest accepted idle window. Cookie Max-Age is whole seconds, so
/// anything shorter would be sent as `Max-Age=0`.
pub const MIN_MAX_AGE: Duration = Duration::from_secs(1);

/// Configuration for a [`Manager`](crate::Manager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Name of the cookie carrying the session identifier.
    pub cookie_name: String,

    /// Idle window for sessions. Also used as the cookie's Max-Age and as
    /// the period of the background GC sweep.
    pub max_age: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl ManagerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the session idle window.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Check that the configuration can drive a manager.
    pub fn validate(&self) -> Result<()> {
        if self.cookie_name.trim().is_empty() {
            return Err(Error::InvalidConfig("cookie name is empty".to_string()));
        }
        if self.max_age < MIN_MAX_AGE {
            return Err(Error::InvalidConfig(format!(
                "max age must be at least one second, got {:?}",
                self.max_age
            )));
        }
        Ok(())
    }
}
