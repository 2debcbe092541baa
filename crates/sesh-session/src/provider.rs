//! Storage provider contract and the registry providers are installed into.
//!
//! The [`Manager`](crate::Manager) never touches session storage directly.
//! It resolves a [`Provider`] by name from a [`ProviderRegistry`] once, at
//! construction, and delegates every lifecycle operation to it. Alternative
//! backends only need to implement the trait and be installed under a name
//! before any manager asks for it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::Result;
use crate::id::SessionId;
use crate::memory::MemoryProvider;
use crate::session::Session;

/// Name the in-memory provider is installed under by
/// [`ProviderRegistry::with_defaults`].
pub const MEMORY_PROVIDER: &str = "memory";

/// Trait for session storage backends.
///
/// Sessions returned by a provider are shared handles into its store, not
/// copies. Every data access on a [`Session`] calls back into
/// [`Provider::session_update`] on its owning provider.
pub trait Provider<V>: Send + Sync {
    /// Create an empty session stored under `id`.
    fn session_init(&self, id: &SessionId) -> Result<Arc<Session<V>>>;

    /// Return the session stored under `id`.
    ///
    /// Unknown identifiers are not an error: implementations create a fresh
    /// session for them, so expired cookies resume transparently.
    fn session_read(&self, id: &SessionId) -> Result<Arc<Session<V>>>;

    /// Drop the session stored under `id`. Unknown identifiers are a no-op.
    fn session_destroy(&self, id: &SessionId) -> Result<()>;

    /// Mark `id` as just accessed. Unknown identifiers are a no-op.
    fn session_update(&self, id: &SessionId) -> Result<()>;

    /// Report an access made through `session`.
    ///
    /// Called by [`Session`] on every data access. A handle that is no
    /// longer the one stored under its id (destroyed, evicted or replaced)
    /// must not refresh whatever session now holds that id. The default
    /// forwards to [`Provider::session_update`]; stores that can tell
    /// handles apart should override it.
    fn session_touch(&self, session: &Session<V>) -> Result<()> {
        self.session_update(session.id())
    }

    /// Evict every session idle for longer than `max_age`.
    ///
    /// Returns the number of sessions evicted.
    fn session_gc(&self, max_age: Duration) -> usize;

    /// Number of sessions currently stored.
    fn session_count(&self) -> usize;
}

/// Name-to-provider mapping consulted when managers are built.
///
/// Registration is first-wins: installing under a name that is already
/// taken keeps the existing provider and logs a warning.
pub struct ProviderRegistry<V> {
    providers: RwLock<HashMap<String, Arc<dyn Provider<V>>>>,
}

impl<V> ProviderRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with the in-memory provider installed as
    /// [`MEMORY_PROVIDER`].
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.install(MEMORY_PROVIDER, MemoryProvider::<V>::new());
        registry
    }

    /// Install `provider` under `name`.
    ///
    /// Returns `false` (and keeps the existing provider) if the name is
    /// already registered.
    pub fn install<P>(&self, name: impl Into<String>, provider: Arc<P>) -> bool
    where
        P: Provider<V> + 'static,
    {
        self.install_arc(name, provider)
    }

    /// Install an already type-erased provider under `name`.
    pub fn install_arc(&self, name: impl Into<String>, provider: Arc<dyn Provider<V>>) -> bool {
        let name = name.into();
        let mut providers = self.providers.write();
        if providers.contains_key(&name) {
            warn!(provider = %name, "Provider already registered, keeping existing one");
            return false;
        }
        debug!(provider = %name, "Provider registered");
        providers.insert(name, provider);
        true
    }

    /// Get a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider<V>>> {
        self.providers.read().get(name).cloned()
    }

    /// Check if a provider is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.read().contains_key(name)
    }

    /// Get all registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}

impl<V> Default for ProviderRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
