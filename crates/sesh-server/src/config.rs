//! Server configuration.

use std::net::{IpAddr, SocketAddr};

use crate::error::{Result, ServerError};

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Enable request logging.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a new server config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Build a bind address from a host string and a port.
    pub fn with_host_port(mut self, host: &str, port: u16) -> Result<Self> {
        let ip: IpAddr = host
            .parse()
            .map_err(|_| ServerError::Config(format!("invalid bind address: {}", host)))?;
        self.bind_address = SocketAddr::new(ip, port);
        Ok(self)
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }
}
