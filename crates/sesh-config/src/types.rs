//! Configuration types.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "sesh_id";

/// Default session idle window in seconds (30 minutes).
pub const DEFAULT_MAX_AGE_SECS: u64 = 30 * 60;

/// Default provider name.
pub const DEFAULT_PROVIDER: &str = "memory";

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Root configuration.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged section by section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeshConfig {
    /// Session manager settings (`[session]`).
    pub session: Option<SessionConfig>,

    /// HTTP server settings (`[server]`).
    pub server: Option<ServerConfig>,
}

impl SeshConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config layer on top of this one.
    ///
    /// Sections present in `other` replace the corresponding section here.
    pub fn merge(&mut self, other: SeshConfig) {
        if other.session.is_some() {
            self.session = other.session;
        }

        if other.server.is_some() {
            self.server = other.server;
        }
    }

    /// Effective session settings (defaults when the section is absent).
    pub fn session(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    /// Effective server settings (defaults when the section is absent).
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        if let Some(ref session) = self.session {
            if session.cookie_name.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "session.cookie_name".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
            if session.max_age_secs == 0 {
                return Err(ConfigError::Invalid {
                    field: "session.max_age_secs".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session id.
    pub cookie_name: String,
    /// Idle window in seconds; also the cookie Max-Age and GC period.
    pub max_age_secs: u64,
    /// Registered provider to store sessions in.
    pub provider: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            provider: DEFAULT_PROVIDER.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable request logging.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            request_logging: true,
        }
    }
}
