//! In-memory provider with recency-ordered eviction.
//!
//! Sessions live in an unbounded [`LruCache`], which doubles as the recency
//! list and the id index: lookups, move-to-front, and tail inspection are all
//! O(1). Every touch moves its session to the front, so walking from the tail
//! visits sessions in non-decreasing `last_access` order and the GC sweep can
//! stop at the first session that is still inside the idle window.

use std::sync::{Arc, Weak};
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::Result;
use crate::id::SessionId;
use crate::provider::Provider;
use crate::session::Session;

/// Provider that keeps every session in process memory.
pub struct MemoryProvider<V> {
    /// Most recently touched first; the tail is the next GC candidate.
    sessions: Mutex<LruCache<String, Arc<Session<V>>>>,

    /// Back-reference handed to sessions so they can report touches.
    this: Weak<MemoryProvider<V>>,
}

impl<V> MemoryProvider<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty provider.
    ///
    /// Returned as an `Arc` because sessions hold a weak reference back to
    /// the provider that created them.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            sessions: Mutex::new(LruCache::unbounded()),
            this: this.clone(),
        })
    }

    /// Identifiers ordered from most to least recently touched.
    pub fn ids_by_recency(&self) -> Vec<SessionId> {
        self.sessions
            .lock()
            .iter()
            .map(|(_, session)| session.id().clone())
            .collect()
    }

    /// Check if a session is stored, without touching it.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.lock().contains(id.as_str())
    }

    fn insert(
        &self,
        sessions: &mut LruCache<String, Arc<Session<V>>>,
        id: &SessionId,
    ) -> Arc<Session<V>> {
        let owner: Weak<dyn Provider<V>> = self.this.clone();
        let session = Arc::new(Session::new(id.clone(), owner));

        if sessions
            .push(id.as_str().to_string(), Arc::clone(&session))
            .is_some_and(|(key, _)| key == id.as_str())
        {
            debug!(session_id = %id, "Replaced existing session");
        }

        debug!(session_id = %id, sessions = sessions.len(), "Session created");
        session
    }
}

impl<V> Provider<V> for MemoryProvider<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn session_init(&self, id: &SessionId) -> Result<Arc<Session<V>>> {
        let mut sessions = self.sessions.lock();
        Ok(self.insert(&mut sessions, id))
    }

    fn session_read(&self, id: &SessionId) -> Result<Arc<Session<V>>> {
        let mut sessions = self.sessions.lock();

        if let Some(session) = sessions.peek(id.as_str()) {
            trace!(session_id = %id, "Session found");
            return Ok(Arc::clone(session));
        }

        debug!(session_id = %id, "Unknown session, starting a fresh one");
        Ok(self.insert(&mut sessions, id))
    }

    fn session_destroy(&self, id: &SessionId) -> Result<()> {
        if self.sessions.lock().pop(id.as_str()).is_some() {
            debug!(session_id = %id, "Session destroyed");
        }
        Ok(())
    }

    fn session_update(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get(id.as_str()) {
            session.mark_accessed();
            trace!(session_id = %id, "Session touched");
        }
        Ok(())
    }

    fn session_touch(&self, session: &Session<V>) -> Result<()> {
        let mut sessions = self.sessions.lock();
        match sessions.peek(session.id().as_str()) {
            Some(stored) if std::ptr::eq(Arc::as_ptr(stored), session) => {
                sessions.promote(session.id().as_str());
                session.mark_accessed();
                trace!(session_id = %session.id(), "Session touched");
            }
            Some(_) => {
                trace!(session_id = %session.id(), "Stale handle, id now belongs to a newer session");
            }
            None => {
                trace!(session_id = %session.id(), "Stale handle, session no longer stored");
            }
        }
        Ok(())
    }

    fn session_gc(&self, max_age: Duration) -> usize {
        let mut sessions = self.sessions.lock();
        let now = Instant::now();
        let mut evicted = 0;

        loop {
            let expired = match sessions.peek_lru() {
                Some((_, session)) => now.saturating_duration_since(session.last_access()) > max_age,
                None => break,
            };
            if !expired {
                break;
            }
            if let Some((id, _)) = sessions.pop_lru() {
                debug!(session_id = %id, "Evicting expired session");
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(count = evicted, remaining = sessions.len(), "Cleaned up expired sessions");
        }

        evicted
    }

    fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> SessionId {
        SessionId::from(s)
    }

    async fn advance_secs(secs: u64) {
        tokio::time::advance(Duration::from_secs(secs)).await;
    }

    #[tokio::test]
    async fn test_init_and_read() {
        let provider = MemoryProvider::<i64>::new();
        let created = provider.session_init(&sid("a")).unwrap();
        created.set("n", 1);

        let read = provider.session_read(&sid("a")).unwrap();
        assert!(Arc::ptr_eq(&created, &read));
        assert_eq!(read.get("n"), Some(1));
        assert_eq!(provider.session_count(), 1);
    }

    #[tokio::test]
    async fn test_read_unknown_creates_empty_session() {
        let provider = MemoryProvider::<i64>::new();
        let session = provider.session_read(&sid("ghost")).unwrap();

        assert_eq!(session.id().as_str(), "ghost");
        assert!(session.is_empty());
        assert!(provider.contains(&sid("ghost")));
    }

    #[tokio::test]
    async fn test_init_replaces_existing() {
        let provider = MemoryProvider::<i64>::new();
        let first = provider.session_init(&sid("a")).unwrap();
        first.set("n", 1);

        let second = provider.session_init(&sid("a")).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.is_empty());
        assert_eq!(provider.session_count(), 1);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let provider = MemoryProvider::<i64>::new();
        provider.session_init(&sid("a")).unwrap();

        provider.session_destroy(&sid("a")).unwrap();
        provider.session_destroy(&sid("a")).unwrap();
        provider.session_destroy(&sid("never-existed")).unwrap();

        assert_eq!(provider.session_count(), 0);
        assert!(!provider.contains(&sid("a")));
    }

    #[tokio::test]
    async fn test_update_unknown_is_noop() {
        let provider = MemoryProvider::<i64>::new();
        provider.session_update(&sid("nope")).unwrap();
        assert_eq!(provider.session_count(), 0);
    }

    #[tokio::test]
    async fn test_touch_moves_to_front() {
        let provider = MemoryProvider::<i64>::new();
        let a = provider.session_init(&sid("a")).unwrap();
        provider.session_init(&sid("b")).unwrap();
        provider.session_init(&sid("c")).unwrap();
        assert_eq!(provider.ids_by_recency(), vec![sid("c"), sid("b"), sid("a")]);

        a.set("k", 1);
        assert_eq!(provider.ids_by_recency(), vec![sid("a"), sid("c"), sid("b")]);
    }

    #[tokio::test]
    async fn test_read_does_not_touch() {
        let provider = MemoryProvider::<i64>::new();
        provider.session_init(&sid("a")).unwrap();
        provider.session_init(&sid("b")).unwrap();

        provider.session_read(&sid("a")).unwrap();
        assert_eq!(provider.ids_by_recency(), vec![sid("b"), sid("a")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recency_matches_last_access() {
        let provider = MemoryProvider::<i64>::new();
        let sessions: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| provider.session_init(&sid(id)).unwrap())
            .collect();

        for (step, idx) in [2usize, 0, 3, 0, 1].into_iter().enumerate() {
            advance_secs(1).await;
            sessions[idx].set("step", step as i64);
        }

        let order = provider.ids_by_recency();
        let stamps: Vec<_> = order
            .iter()
            .map(|id| provider.session_read(id).unwrap().last_access())
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(order, vec![sid("b"), sid("a"), sid("d"), sid("c")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_single_session_scenario() {
        let max_age = Duration::from_secs(10);
        let provider = MemoryProvider::<i64>::new();

        let a = provider.session_init(&sid("a")).unwrap();

        advance_secs(1).await;
        a.set("n", 1);

        advance_secs(4).await; // t=5
        assert_eq!(provider.session_gc(max_age), 0);
        assert!(provider.contains(&sid("a")));

        advance_secs(7).await; // t=12
        assert_eq!(provider.session_gc(max_age), 1);
        assert!(!provider.contains(&sid("a")));

        advance_secs(1).await; // t=13
        let resumed = provider.session_read(&sid("a")).unwrap();
        assert!(resumed.is_empty());
        assert!(!Arc::ptr_eq(&a, &resumed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_evicts_only_expired_prefix() {
        let max_age = Duration::from_secs(10);
        let provider = MemoryProvider::<i64>::new();

        provider.session_init(&sid("a")).unwrap(); // t=0
        advance_secs(5).await;
        provider.session_init(&sid("b")).unwrap(); // t=5

        advance_secs(6).await; // t=11
        assert_eq!(provider.session_gc(max_age), 1);

        assert!(!provider.contains(&sid("a")));
        assert!(provider.contains(&sid("b")));
        let b = provider.session_read(&sid("b")).unwrap();
        assert_eq!(b.id(), &sid("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_boundary_is_exclusive() {
        let max_age = Duration::from_secs(10);
        let provider = MemoryProvider::<i64>::new();
        provider.session_init(&sid("a")).unwrap();

        advance_secs(10).await;
        assert_eq!(provider.session_gc(max_age), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(provider.session_gc(max_age), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_many_sessions_oldest_first() {
        let max_age = Duration::from_secs(10);
        let provider = MemoryProvider::<i64>::new();

        for i in 0..20 {
            provider.session_init(&sid(&format!("s{i}"))).unwrap();
            advance_secs(1).await;
        }
        // now t=20, sessions created at t=0..=19
        assert_eq!(provider.session_gc(max_age), 10);

        let remaining = provider.ids_by_recency();
        assert_eq!(remaining.len(), 10);
        assert_eq!(remaining.last(), Some(&sid("s10")));
        assert_eq!(remaining.first(), Some(&sid("s19")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_spares_recently_touched_old_session() {
        let max_age = Duration::from_secs(10);
        let provider = MemoryProvider::<i64>::new();

        let old = provider.session_init(&sid("old")).unwrap();
        advance_secs(1).await;
        provider.session_init(&sid("young")).unwrap();

        advance_secs(8).await; // t=9
        let _ = old.get("anything");

        advance_secs(3).await; // t=12
        assert_eq!(provider.session_gc(max_age), 1);
        assert!(provider.contains(&sid("old")));
        assert!(!provider.contains(&sid("young")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroyed_handle_does_not_refresh_successor() {
        let max_age = Duration::from_secs(10);
        let provider = MemoryProvider::<i64>::new();

        let old = provider.session_init(&sid("x")).unwrap();
        provider.session_destroy(&sid("x")).unwrap();
        let fresh = provider.session_read(&sid("x")).unwrap();
        let created = fresh.last_access();

        advance_secs(8).await;
        old.set("k", 1);
        assert_eq!(fresh.last_access(), created);

        advance_secs(5).await; // fresh idle for 13s
        assert_eq!(provider.session_gc(max_age), 1);
        assert!(!provider.contains(&sid("x")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_handle_does_not_refresh_successor() {
        let max_age = Duration::from_secs(10);
        let provider = MemoryProvider::<i64>::new();

        let old = provider.session_init(&sid("x")).unwrap();
        advance_secs(11).await;
        assert_eq!(provider.session_gc(max_age), 1);

        let fresh = provider.session_read(&sid("x")).unwrap();
        provider.session_init(&sid("y")).unwrap();
        assert_eq!(provider.ids_by_recency(), vec![sid("y"), sid("x")]);

        advance_secs(3).await;
        let _ = old.get("k");
        assert_eq!(provider.ids_by_recency(), vec![sid("y"), sid("x")]);
        assert_eq!(fresh.last_access() + Duration::from_secs(3), Instant::now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_handle_does_not_refresh_successor() {
        let provider = MemoryProvider::<i64>::new();

        let old = provider.session_init(&sid("x")).unwrap();
        let replacement = provider.session_init(&sid("x")).unwrap();
        let created = replacement.last_access();

        advance_secs(4).await;
        old.delete("k");
        assert_eq!(replacement.last_access(), created);

        replacement.set("k", 1);
        assert_eq!(replacement.last_access(), created + Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_gc_on_empty_store() {
        let provider = MemoryProvider::<i64>::new();
        assert_eq!(provider.session_gc(Duration::from_secs(1)), 0);
    }

    #[test]
    fn test_concurrent_read_of_unknown_id_yields_one_session() {
        let provider = MemoryProvider::<i64>::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let provider = Arc::clone(&provider);
                std::thread::spawn(move || provider.session_read(&sid("shared")).unwrap())
            })
            .collect();
        let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(provider.session_count(), 1);
    }

    #[test]
    fn test_concurrent_touch_and_gc() {
        let provider = MemoryProvider::<i64>::new();
        let sessions: Vec<_> = (0..16)
            .map(|i| provider.session_init(&sid(&format!("s{i}"))).unwrap())
            .collect();

        let workers: Vec<_> = sessions
            .into_iter()
            .map(|s| {
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        s.update("n", |v| v.map_or(1, |n| n + 1));
                    }
                })
            })
            .collect();
        let sweeper = {
            let provider = Arc::clone(&provider);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    provider.session_gc(Duration::from_secs(3600));
                }
            })
        };

        for w in workers {
            w.join().unwrap();
        }
        sweeper.join().unwrap();

        assert_eq!(provider.session_count(), 16);
    }
}
