//! Session registry keyed by caller-supplied session id.
//!
//! Each key owns an `Arc<tokio::sync::Mutex<Session>>`. A `SessionLease` is
//! an owned guard on that mutex: holding it serializes every read-modify-write
//! on one key while unrelated keys proceed in parallel. The registry itself
//! sits behind a plain mutex that is only held for map bookkeeping, never
//! across an `.await`.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use tokio::sync::OwnedMutexGuard;
use tokio::time::Instant;
use tracing::{debug, warn};

use chatgate_types::chat::Turn;
use chatgate_types::config::SessionConfig;
use chatgate_types::session::{ContinuationToken, Session};

type SharedSession = Arc<tokio::sync::Mutex<Session>>;

struct Slot {
    session: SharedSession,
    last_used: Instant,
}

impl Slot {
    /// A slot is leased while anyone besides the registry holds its Arc.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }
}

/// In-process session registry with LRU capacity and idle-TTL eviction.
pub struct SessionStore {
    slots: Mutex<LruCache<String, Slot>>,
    capacity: NonZeroUsize,
    idle_ttl: Option<Duration>,
}

impl SessionStore {
    pub fn new(capacity: NonZeroUsize, idle_ttl: Option<Duration>) -> Self {
        Self {
            slots: Mutex::new(LruCache::unbounded()),
            capacity,
            idle_ttl,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self::new(capacity, config.idle_ttl())
    }

    fn registry(&self) -> MutexGuard<'_, LruCache<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up or create the slot for `id`, marking it most recently used.
    fn slot(&self, id: &str) -> SharedSession {
        let mut slots = self.registry();
        if let Some(slot) = slots.get_mut(id) {
            slot.last_used = Instant::now();
            return Arc::clone(&slot.session);
        }

        let session = SharedSession::default();
        slots.put(
            id.to_string(),
            Slot {
                session: Arc::clone(&session),
                last_used: Instant::now(),
            },
        );
        debug!(session_id = %id, "Session created");
        self.enforce_capacity(&mut slots);
        session
    }

    /// Evict least-recently-used idle slots until the registry fits.
    fn enforce_capacity(&self, slots: &mut LruCache<String, Slot>) {
        while slots.len() > self.capacity.get() {
            let victim = slots
                .iter()
                .rev()
                .find(|(_, slot)| !slot.in_use())
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    slots.pop(&key);
                    debug!(session_id = %key, "Session evicted (capacity)");
                }
                None => {
                    warn!(
                        sessions = slots.len(),
                        capacity = self.capacity.get(),
                        "Every session is in use, exceeding capacity"
                    );
                    break;
                }
            }
        }
    }

    /// Take exclusive access to a session, creating it if absent.
    ///
    /// A malformed session is reset to empty before the lease is returned.
    pub async fn acquire(&self, id: &str) -> SessionLease {
        let mut guard = self.slot(id).lock_owned().await;
        if !guard.is_well_formed() {
            warn!(
                session_id = %id,
                turns = guard.turn_count(),
                "Malformed session state, resetting"
            );
            *guard = Session::default();
        }
        SessionLease {
            id: id.to_string(),
            guard,
        }
    }

    /// Snapshot of the session for `id`, creating an empty one if absent.
    pub async fn ensure(&self, id: &str) -> Session {
        self.acquire(id).await.session().clone()
    }

    /// Snapshot of the session for `id`, or `None` if it does not exist.
    pub async fn get(&self, id: &str) -> Option<Session> {
        let existing = {
            let mut slots = self.registry();
            slots.get(id).map(|slot| Arc::clone(&slot.session))
        }?;
        let guard = existing.lock().await;
        Some(guard.clone())
    }

    /// Append `turns` and replace the continuation token for `id`.
    pub async fn update(&self, id: &str, turns: Vec<Turn>, context: Option<ContinuationToken>) {
        self.acquire(id).await.commit(turns, context);
    }

    /// Drop sessions idle for longer than the configured TTL.
    ///
    /// Leased sessions are never evicted. Returns the number removed.
    pub fn evict_idle(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };
        let mut slots = self.registry();
        let expired: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| !slot.in_use() && slot.last_used.elapsed() >= ttl)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            slots.pop(key);
        }
        if !expired.is_empty() {
            debug!(evicted = expired.len(), "Idle sessions evicted");
        }
        expired.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry().contains(id)
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// Exclusive access to one session for the duration of a request.
///
/// Dropping the lease without calling `commit` leaves the session unchanged.
pub struct SessionLease {
    id: String,
    guard: OwnedMutexGuard<Session>,
}

impl SessionLease {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn session(&self) -> &Session {
        &self.guard
    }

    /// Append turns and replace the continuation token in one step.
    pub fn commit(mut self, turns: Vec<Turn>, context: Option<ContinuationToken>) {
        self.guard.messages.extend(turns);
        self.guard.context = context;
        debug!(
            session_id = %self.id,
            turns = self.guard.turn_count(),
            "Session committed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(capacity: usize) -> SessionStore {
        SessionStore::new(NonZeroUsize::new(capacity).unwrap(), None)
    }

    #[tokio::test]
    async fn test_ensure_creates_empty_session() {
        let store = store(4);
        assert!(store.get("a").await.is_none());

        let session = store.ensure("a").await;
        assert!(session.is_empty());
        assert!(store.contains("a"));
        assert_eq!(store.get("a").await, Some(Session::default()));
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let store = store(4);
        store
            .update("a", vec![Turn::user("hi"), Turn::assistant("hello")], Some(json!([7])))
            .await;
        let session = store.ensure("a").await;
        assert_eq!(session.turn_count(), 2);
        assert_eq!(session.context, Some(json!([7])));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_context_wholesale() {
        let store = store(4);
        store
            .update("a", vec![Turn::user("1"), Turn::assistant("2")], Some(json!([1, 2])))
            .await;
        store
            .update("a", vec![Turn::user("3"), Turn::assistant("4")], Some(json!([9])))
            .await;
        let session = store.get("a").await.unwrap();
        assert_eq!(session.turn_count(), 4);
        assert_eq!(session.context, Some(json!([9])));
    }

    #[tokio::test]
    async fn test_dropped_lease_leaves_session_unchanged() {
        let store = store(4);
        store
            .update("a", vec![Turn::user("1"), Turn::assistant("2")], None)
            .await;
        {
            let lease = store.acquire("a").await;
            assert_eq!(lease.id(), "a");
            assert_eq!(lease.session().turn_count(), 2);
        }
        assert_eq!(store.get("a").await.unwrap().turn_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_session_self_heals() {
        let store = store(4);
        // A lone user turn is what a half-finished write would leave behind.
        store.update("a", vec![Turn::user("orphan")], Some(json!([1]))).await;
        assert_eq!(store.get("a").await.unwrap().turn_count(), 1);

        let healed = store.ensure("a").await;
        assert_eq!(healed, Session::default());
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let store = store(2);
        store.ensure("a").await;
        store.ensure("b").await;
        // Touch "a" so "b" becomes the eviction candidate.
        store.ensure("a").await;
        store.ensure("c").await;

        assert_eq!(store.len(), 2);
        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
    }

    #[tokio::test]
    async fn test_capacity_skips_leased_sessions() {
        let store = store(2);
        let lease = store.acquire("a").await;
        store.ensure("b").await;
        store.ensure("c").await;

        // "a" is least recently used but leased, so idle "b" goes instead.
        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
        drop(lease);
    }

    #[tokio::test]
    async fn test_capacity_grows_when_everything_is_leased() {
        let store = store(1);
        let _a = store.acquire("a").await;
        let _b = store.acquire("b").await;
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_respects_ttl_and_leases() {
        let store = SessionStore::new(NonZeroUsize::new(8).unwrap(), Some(Duration::from_secs(60)));
        store.ensure("idle").await;
        let lease = store.acquire("busy").await;

        tokio::time::advance(Duration::from_secs(61)).await;
        store.ensure("fresh").await;

        assert_eq!(store.evict_idle(), 1);
        assert!(!store.contains("idle"));
        assert!(store.contains("busy"));
        assert!(store.contains("fresh"));
        drop(lease);
    }

    #[tokio::test]
    async fn test_evict_idle_disabled_without_ttl() {
        let store = store(4);
        store.ensure("a").await;
        assert_eq!(store.evict_idle(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_leases_serialize_same_key() {
        let store = Arc::new(store(4));
        let first = store.acquire("a").await;

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.acquire("a").await.session().turn_count() })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        first.commit(vec![Turn::user("1"), Turn::assistant("2")], None);
        assert_eq!(waiter.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unrelated_keys_do_not_block() {
        let store = store(4);
        let _a = store.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_secs(1), store.acquire("b")).await;
        assert!(b.is_ok());
    }
}
