//! Error types for session operations.

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No provider is registered under the requested name.
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// The OS random source could not produce a session identifier.
    #[error("Failed to generate session identifier: {0}")]
    Entropy(String),

    /// Manager configuration was rejected.
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),

    /// Error raised by a storage backend.
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
