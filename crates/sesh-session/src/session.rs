//! The per-identifier key/value container.

use std::collections::HashMap;
use std::fmt;
use std::sync::Weak;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{trace, warn};

use crate::id::SessionId;
use crate::provider::Provider;

/// Server-side state associated with one session identifier.
///
/// Handles are shared (`Arc<Session<V>>`) between the provider that owns
/// them and every request currently using them. Every data access notifies
/// the owning provider so the session moves to the front of its recency
/// order.
///
/// The data map has its own lock, so concurrent requests presenting the same
/// cookie never race on the map itself. Use [`Session::update`] when a value
/// must be read and rewritten atomically.
pub struct Session<V> {
    id: SessionId,
    last_access: Mutex<Instant>,
    data: Mutex<HashMap<String, V>>,
    provider: Weak<dyn Provider<V>>,
}

impl<V> Session<V> {
    /// The identifier this session is stored under.
    pub fn id(&self) -> &SessionId {
        &self.id
    }
}

impl<V> Session<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty session owned by `provider`.
    ///
    /// Providers hand out a weak back-reference to themselves so that
    /// sessions never keep their store alive.
    pub fn new(id: SessionId, provider: Weak<dyn Provider<V>>) -> Self {
        Self {
            id,
            last_access: Mutex::new(Instant::now()),
            data: Mutex::new(HashMap::new()),
            provider,
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.data.lock().insert(key.into(), value);
        self.touch();
    }

    /// Fetch a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        let value = self.data.lock().get(key).cloned();
        self.touch();
        value
    }

    /// Remove `key`, returning the value it held.
    pub fn delete(&self, key: &str) -> Option<V> {
        let value = self.data.lock().remove(key);
        self.touch();
        value
    }

    /// Read-modify-write `key` under the session lock.
    ///
    /// `f` receives the current value (if any) and returns the value to
    /// store, which is also returned to the caller.
    pub fn update<F>(&self, key: impl Into<String>, f: F) -> V
    where
        F: FnOnce(Option<&V>) -> V,
    {
        let next = {
            let mut data = self.data.lock();
            let key = key.into();
            let next = f(data.get(&key));
            data.insert(key, next.clone());
            next
        };
        self.touch();
        next
    }

    /// Check whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        let present = self.data.lock().contains_key(key);
        self.touch();
        present
    }

    /// Number of stored keys. Does not count as an access.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// Whether the session holds no data. Does not count as an access.
    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    /// When the session was last touched.
    pub fn last_access(&self) -> Instant {
        *self.last_access.lock()
    }

    /// Record an access at the current time.
    ///
    /// Called by providers from `session_touch` or `session_update` while
    /// they hold their structural lock, so the timestamp and the recency
    /// position change together.
    pub fn mark_accessed(&self) -> Instant {
        let now = Instant::now();
        let mut last = self.last_access.lock();
        if now > *last {
            *last = now;
        }
        *last
    }

    /// Ask the owning provider to refresh this session's recency.
    ///
    /// The data lock is always released before this runs.
    fn touch(&self) {
        let Some(provider) = self.provider.upgrade() else {
            trace!(session_id = %self.id, "Session provider dropped, skipping touch");
            return;
        };
        if let Err(e) = provider.session_touch(self) {
            warn!(session_id = %self.id, error = %e, "Failed to refresh session recency");
        }
    }
}

impl<V> fmt::Debug for Session<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("last_access", &*self.last_access.lock())
            .field("keys", &self.data.lock().len())
            .finish()
    }
}
