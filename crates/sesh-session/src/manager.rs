//! Session lifecycle orchestration.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::ManagerConfig;
use crate::error::{Error, Result};
use crate::gc::GcTask;
use crate::id::SessionId;
use crate::provider::{Provider, ProviderRegistry};
use crate::session::Session;
use crate::transport::{CookieTransport, SessionCookie};

/// Source of fresh session identifiers.
pub type IdGenerator = Box<dyn Fn() -> Result<SessionId> + Send + Sync>;

/// Decides, per request, whether to create or resume a session.
///
/// The decision is driven purely by the presence of the session cookie:
/// no cookie (or an empty one) means a new session and a `Set-Cookie`;
/// a cookie means "read whatever the provider has under that id", which the
/// provider resolves to a fresh session if the id is stale or unknown.
///
/// The manager lock serializes `start_session`, `destroy_session` and `gc`
/// against each other. Data access through the returned [`Session`] does not
/// take it.
pub struct Manager<V> {
    config: ManagerConfig,
    provider: Arc<dyn Provider<V>>,
    generate: IdGenerator,
    lock: Mutex<()>,
}

impl<V> Manager<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a manager backed by the provider registered as `provider_name`.
    pub fn new(
        registry: &ProviderRegistry<V>,
        provider_name: &str,
        config: ManagerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let provider = registry
            .get(provider_name)
            .ok_or_else(|| Error::ProviderNotFound(provider_name.to_string()))?;

        debug!(
            provider = provider_name,
            cookie_name = %config.cookie_name,
            max_age_secs = config.max_age.as_secs(),
            "Session manager created"
        );

        Ok(Self {
            config,
            provider,
            generate: Box::new(SessionId::generate),
            lock: Mutex::new(()),
        })
    }

    /// Replace the identifier source used for new sessions.
    ///
    /// Defaults to [`Manager::generate_id`].
    pub fn with_id_generator<F>(mut self, generate: F) -> Self
    where
        F: Fn() -> Result<SessionId> + Send + Sync + 'static,
    {
        self.generate = Box::new(generate);
        self
    }

    /// Generate a new unguessable session identifier.
    pub fn generate_id() -> Result<SessionId> {
        SessionId::generate()
    }

    /// Resume the session named by the request cookie, or start a new one.
    pub fn start_session<T>(&self, transport: &mut T) -> Result<Arc<Session<V>>>
    where
        T: CookieTransport + ?Sized,
    {
        let _guard = self.lock.lock();

        match transport
            .cookie(&self.config.cookie_name)
            .filter(|value| !value.is_empty())
        {
            Some(value) => {
                let id = SessionId::from(value);
                let session = self.provider.session_read(&id)?;
                trace!(session_id = %id, "Session resumed");
                Ok(session)
            }
            None => {
                let id = (self.generate)()?;
                let session = self.provider.session_init(&id)?;
                transport.set_cookie(SessionCookie::session(
                    self.config.cookie_name.as_str(),
                    id.as_str(),
                    self.config.max_age,
                ));
                debug!(session_id = %id, "Session started");
                Ok(session)
            }
        }
    }

    /// Drop the session named by the request cookie and expire the cookie.
    ///
    /// A request without the cookie is a no-op.
    pub fn destroy_session<T>(&self, transport: &mut T) -> Result<()>
    where
        T: CookieTransport + ?Sized,
    {
        let Some(value) = transport
            .cookie(&self.config.cookie_name)
            .filter(|value| !value.is_empty())
        else {
            return Ok(());
        };

        let _guard = self.lock.lock();
        let id = SessionId::from(value);
        self.provider.session_destroy(&id)?;
        transport.set_cookie(SessionCookie::expired(self.config.cookie_name.as_str()));
        debug!(session_id = %id, "Session ended");
        Ok(())
    }

    /// Run one GC sweep now. Returns the number of sessions evicted.
    pub fn gc(&self) -> usize {
        let _guard = self.lock.lock();
        self.provider.session_gc(self.config.max_age)
    }

    /// Start the periodic GC task with its own cancellation token.
    pub fn run_gc(self: &Arc<Self>) -> GcTask {
        self.run_gc_with(CancellationToken::new())
    }

    /// Start the periodic GC task, stopping when `token` is cancelled.
    pub fn run_gc_with(self: &Arc<Self>, token: CancellationToken) -> GcTask {
        GcTask::spawn(Arc::clone(self), token)
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    pub fn max_age(&self) -> Duration {
        self.config.max_age
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The provider this manager delegates to.
    pub fn provider(&self) -> &Arc<dyn Provider<V>> {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MEMORY_PROVIDER;
    use crate::transport::MemoryTransport;

    const COOKIE: &str = "gosessionid";

    fn manager(max_age_secs: u64) -> Manager<i64> {
        let registry = ProviderRegistry::with_defaults();
        let config = ManagerConfig::new()
            .with_cookie_name(COOKIE)
            .with_max_age(Duration::from_secs(max_age_secs));
        Manager::new(&registry, MEMORY_PROVIDER, config).unwrap()
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ProviderRegistry::<i64>::with_defaults();
        let result = Manager::new(&registry, "redis", ManagerConfig::default());
        assert!(matches!(result, Err(Error::ProviderNotFound(name)) if name == "redis"));
    }

    #[test]
    fn test_invalid_config() {
        let registry = ProviderRegistry::<i64>::with_defaults();
        let config = ManagerConfig::new().with_max_age(Duration::ZERO);
        let result = Manager::new(&registry, MEMORY_PROVIDER, config);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_entropy_failure_sets_no_cookie() {
        let manager = manager(10)
            .with_id_generator(|| Err(Error::Entropy("random source exhausted".to_string())));

        let mut transport = MemoryTransport::new();
        let result = manager.start_session(&mut transport);

        assert!(matches!(result, Err(Error::Entropy(_))));
        assert!(transport.response_cookies().is_empty());
        assert_eq!(manager.provider().session_count(), 0);

        // Resuming does not need a new identifier.
        let mut returning = MemoryTransport::new().with_cookie(COOKIE, "known");
        let session = manager.start_session(&mut returning).unwrap();
        assert_eq!(session.id().as_str(), "known");
    }

    #[tokio::test]
    async fn test_custom_id_generator() {
        let manager = manager(10).with_id_generator(|| Ok(SessionId::from("fixed")));

        let mut transport = MemoryTransport::new();
        let session = manager.start_session(&mut transport).unwrap();

        assert_eq!(session.id().as_str(), "fixed");
        assert_eq!(transport.response_cookies()[0].value, "fixed");
    }

    #[test]
    fn test_generate_id_is_never_empty() {
        let id = Manager::<i64>::generate_id().unwrap();
        assert!(!id.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_resume() {
        let manager = manager(10);

        let mut first = MemoryTransport::new();
        let session = manager.start_session(&mut first).unwrap();
        assert!(session.is_empty());

        let cookies = first.response_cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, COOKIE);
        assert_eq!(cookies[0].value, session.id().as_str());
        assert_eq!(cookies[0].max_age, 10);
        assert!(cookies[0].http_only);

        session.set("countnum", 1);

        let mut second = first.follow_up();
        let resumed = manager.start_session(&mut second).unwrap();
        assert!(Arc::ptr_eq(&session, &resumed));
        assert_eq!(resumed.get("countnum"), Some(1));
        assert!(second.response_cookies().is_empty());
        assert_eq!(manager.provider().session_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_cookie_starts_new_session() {
        let manager = manager(10);
        let mut transport = MemoryTransport::new().with_cookie(COOKIE, "");

        let session = manager.start_session(&mut transport).unwrap();
        assert!(!session.id().is_empty());
        assert_eq!(transport.response_cookies().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_cookie_resumes_fresh_session() {
        let manager = manager(10);
        let mut transport = MemoryTransport::new().with_cookie(COOKIE, "stale-id");

        let session = manager.start_session(&mut transport).unwrap();
        assert_eq!(session.id().as_str(), "stale-id");
        assert!(session.is_empty());
        assert!(transport.response_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_session() {
        let manager = manager(10);
        let mut first = MemoryTransport::new();
        let session = manager.start_session(&mut first).unwrap();
        session.set("countnum", 3);

        let mut second = first.follow_up();
        manager.destroy_session(&mut second).unwrap();

        let cookies = second.response_cookies();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].is_removal());
        assert_eq!(cookies[0].name, COOKIE);
        assert_eq!(manager.provider().session_count(), 0);

        let mut third = second.follow_up();
        let fresh = manager.start_session(&mut third).unwrap();
        assert!(fresh.is_empty());
        assert_ne!(fresh.id(), session.id());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let manager = manager(10);

        let mut no_cookie = MemoryTransport::new();
        manager.destroy_session(&mut no_cookie).unwrap();
        assert!(no_cookie.response_cookies().is_empty());

        let mut stale = MemoryTransport::new().with_cookie(COOKIE, "gone");
        manager.destroy_session(&mut stale).unwrap();
        manager.destroy_session(&mut stale).unwrap();
        assert_eq!(manager.provider().session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_scenario_through_manager() {
        let manager = manager(10);
        let mut first = MemoryTransport::new();
        let session = manager.start_session(&mut first).unwrap();

        tokio::time::advance(Duration::from_secs(1)).await;
        session.set("n", 1);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(manager.gc(), 0);

        tokio::time::advance(Duration::from_secs(7)).await;
        assert_eq!(manager.gc(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        let mut again = first.follow_up();
        let resumed = manager.start_session(&mut again).unwrap();
        assert_eq!(resumed.id(), session.id());
        assert_eq!(resumed.get("n"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_task_sweeps_and_stops() {
        let manager = Arc::new(manager(10));
        let mut transport = MemoryTransport::new();
        manager.start_session(&mut transport).unwrap();

        let task = manager.run_gc();

        // Ticks at t=0 and t=10 leave the session alone (idle 0s, 10s).
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(manager.provider().session_count(), 1);

        // The t=20 tick sees 20s of idleness.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(manager.provider().session_count(), 0);

        task.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_task_follows_parent_token() {
        let manager = Arc::new(manager(10));
        let parent = CancellationToken::new();
        let task = manager.run_gc_with(parent.child_token());

        parent.cancel();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(task.is_finished());
        task.shutdown().await;
    }

    #[test]
    fn test_concurrent_first_visits_get_distinct_sessions() {
        let manager = Arc::new(manager(60));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    let mut transport = MemoryTransport::new();
                    manager.start_session(&mut transport).unwrap().id().clone()
                })
            })
            .collect();

        let mut ids: Vec<SessionId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(manager.provider().session_count(), 8);
    }
}
