//! Cookie-driven server-side sessions.
//!
//! This crate provides:
//! - A [`Manager`] that maps cookie presence to create-or-resume decisions
//! - A pluggable [`Provider`] contract and a [`ProviderRegistry`] to look
//!   providers up by name
//! - [`MemoryProvider`], an in-process store with recency-ordered eviction
//! - A cancellable background GC task ([`GcTask`])
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sesh_session::{Manager, ManagerConfig, ProviderRegistry, MEMORY_PROVIDER};
//!
//! let registry = ProviderRegistry::<i64>::with_defaults();
//! let config = ManagerConfig::new()
//!     .with_cookie_name("sesh_id")
//!     .with_max_age(Duration::from_secs(600));
//!
//! let manager = Arc::new(Manager::new(&registry, MEMORY_PROVIDER, config)?);
//! let gc = manager.run_gc();
//!
//! let session = manager.start_session(&mut transport)?;
//! session.update("visits", |n| n.map_or(1, |n| n + 1));
//!
//! gc.shutdown().await;
//! ```

mod config;
mod error;
mod gc;
mod id;
mod manager;
mod memory;
mod provider;
mod session;
mod transport;

pub use config::{DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE, MIN_MAX_AGE, ManagerConfig};
pub use error::{Error, Result};
pub use gc::GcTask;
pub use id::{SESSION_ID_BYTES, SessionId};
pub use manager::{IdGenerator, Manager};
pub use memory::MemoryProvider;
pub use provider::{MEMORY_PROVIDER, Provider, ProviderRegistry};
pub use session::Session;
pub use transport::{CookieTransport, MemoryTransport, SessionCookie};

pub use tokio_util::sync::CancellationToken;
