use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use super::QueryError;
use crate::api::ApiError;

/// Default time a fetched value is served without going back to the backend.
pub const DEFAULT_TTL_MINUTES: i64 = 5;

/// Cached values are opaque to the store; each reader downcasts to its own type.
type Payload = Arc<dyn Any + Send + Sync>;

type SharedFetch = Shared<BoxFuture<'static, Result<Payload, QueryError>>>;

#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.cached_at
    }

    pub fn age_minutes(&self) -> i64 {
        self.age().num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Clock skew can make this negative
            "agora mesmo".to_string()
        } else if minutes < 60 {
            format!("há {} min", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            let remaining_mins = minutes % 60;
            if remaining_mins >= 30 {
                format!("há {} h", hours + 1)
            } else {
                format!("há {} h", hours)
            }
        } else {
            let days = minutes / 1440;
            let remaining_hours = (minutes % 1440) / 60;
            if remaining_hours >= 12 {
                format!("há {} d", days + 1)
            } else {
                format!("há {} d", days)
            }
        }
    }

    /// Fresh while `now - cached_at < ttl`. Evaluated on read; nothing sweeps.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
    /// Entry removed by `refetch`, restored if the new fetch fails
    previous: Option<CachedData<Payload>>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CachedData<Payload>>,
    in_flight: HashMap<String, InFlight>,
    next_generation: u64,
}

/// Keyed in-memory cache shared by every query in the application.
///
/// One instance is created at startup and handed to each consumer; clones
/// share the same map. Concurrent misses for one key are coalesced onto a
/// single fetch, and fetches run as spawned tasks so they finish (and
/// populate the cache) even when the caller that started them goes away.
///
/// Entries live until invalidated or overwritten; there is no size bound.
#[derive(Clone, Default)]
pub struct QueryCache {
    state: Arc<Mutex<CacheState>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve `key` from memory when fresh, otherwise fetch it.
    ///
    /// A miss while another fetch for `key` is outstanding waits for that
    /// fetch instead of issuing a second request.
    pub async fn fetch<T, F, Fut>(&self, key: &str, ttl: Duration, fetcher: F) -> Result<T, QueryError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let joined = {
            let state = self.lock();
            if let Some(value) = Self::fresh_value::<T>(&state, key, ttl) {
                debug!(key = %key, "Cache hit");
                return Ok(value);
            }
            state.in_flight.get(key).map(|in_flight| in_flight.fetch.clone())
        };
        if let Some(fetch) = joined {
            debug!(key = %key, "Joining in-flight fetch");
            return Self::downcast(key, fetch.await?);
        }

        debug!(key = %key, "Cache miss, fetching");
        // Built outside the lock so a fetcher may read this cache
        let request = fetcher();
        let fetch = {
            let mut state = self.lock();
            match state.in_flight.get(key) {
                Some(in_flight) => in_flight.fetch.clone(),
                None => self.start_fetch(&mut state, key, None, request),
            }
        };

        Self::downcast(key, fetch.await?)
    }

    /// Drop `key` and fetch it again regardless of freshness.
    ///
    /// Never joins an older in-flight fetch; that fetch's result is discarded
    /// when it lands. If the new fetch fails, the dropped entry is put back.
    pub async fn refetch<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<T, QueryError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let request = fetcher();
        let fetch = {
            let mut state = self.lock();
            // An overlapping refetch already removed the entry; keep its
            // snapshot so a failure here still restores the last good value
            let previous = match state.entries.remove(key) {
                Some(entry) => Some(entry),
                None => state.in_flight.get(key).and_then(|f| f.previous.clone()),
            };
            debug!(key = %key, had_entry = previous.is_some(), "Refetching");
            self.start_fetch(&mut state, key, previous, request)
        };

        Self::downcast(key, fetch.await?)
    }

    /// Fresh cached value for `key`, without fetching.
    pub fn get<T: Clone + 'static>(&self, key: &str, ttl: Duration) -> Option<T> {
        Self::fresh_value(&self.lock(), key, ttl)
    }

    /// Forget `key`. An outstanding fetch for it will not repopulate the cache.
    pub fn invalidate(&self, key: &str) {
        let mut state = self.lock();
        let removed = state.entries.remove(key).is_some();
        let cancelled = state.in_flight.remove(key).is_some();
        debug!(key = %key, removed, cancelled, "Invalidated cache key");
    }

    pub fn contains_fresh(&self, key: &str, ttl: Duration) -> bool {
        self.lock()
            .entries
            .get(key)
            .map(|entry| entry.is_fresh(ttl))
            .unwrap_or(false)
    }

    pub fn is_fetching(&self, key: &str) -> bool {
        self.lock().in_flight.contains_key(key)
    }

    /// Human-readable age of `key` ("agora mesmo", "há 5 min", ...).
    pub fn age_display(&self, key: &str) -> Option<String> {
        self.lock().entries.get(key).map(|entry| entry.age_display())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh_value<T: Clone + 'static>(state: &CacheState, key: &str, ttl: Duration) -> Option<T> {
        let entry = state.entries.get(key)?;
        if !entry.is_fresh(ttl) {
            return None;
        }
        match entry.data.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                warn!(key = %key, "Cached value has a different type, treating as a miss");
                None
            }
        }
    }

    fn downcast<T: Clone + 'static>(key: &str, payload: Payload) -> Result<T, QueryError> {
        payload.downcast_ref::<T>().cloned().ok_or_else(|| {
            QueryError::new(format!("o valor em cache de '{}' tem um tipo inesperado", key))
        })
    }

    /// Register and spawn a fetch for `key`, superseding any earlier one.
    fn start_fetch<T, Fut>(
        &self,
        state: &mut CacheState,
        key: &str,
        previous: Option<CachedData<Payload>>,
        request: Fut,
    ) -> SharedFetch
    where
        T: Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        state.next_generation += 1;
        let generation = state.next_generation;

        let cache = self.clone();
        let task_key = key.to_string();
        let handle = tokio::spawn(async move {
            let result = request
                .await
                .map(|value| Arc::new(value) as Payload)
                .map_err(QueryError::from);
            cache.complete(&task_key, generation, &result);
            result
        });

        let cache = self.clone();
        let task_key = key.to_string();
        let fetch = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    cache.abandon(&task_key, generation);
                    Err(QueryError::new(format!("a busca falhou: {}", e)))
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            key.to_string(),
            InFlight {
                generation,
                fetch: fetch.clone(),
                previous,
            },
        );
        fetch
    }

    /// Publish a finished fetch unless a newer one has replaced it.
    fn complete(&self, key: &str, generation: u64, result: &Result<Payload, QueryError>) {
        let mut state = self.lock();
        let is_current = state
            .in_flight
            .get(key)
            .map(|f| f.generation == generation)
            .unwrap_or(false);
        if !is_current {
            debug!(key = %key, generation, "Discarding superseded fetch result");
            return;
        }

        let Some(in_flight) = state.in_flight.remove(key) else {
            return;
        };
        match result {
            Ok(value) => {
                state.entries.insert(key.to_string(), CachedData::new(Arc::clone(value)));
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Fetch failed");
                if let Some(previous) = in_flight.previous {
                    state.entries.insert(key.to_string(), previous);
                }
            }
        }
    }

    fn abandon(&self, key: &str, generation: u64) {
        let mut state = self.lock();
        if state.in_flight.get(key).map(|f| f.generation) == Some(generation) {
            state.in_flight.remove(key);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn ttl() -> Duration {
        Duration::minutes(DEFAULT_TTL_MINUTES)
    }

    fn counting_fetcher(
        calls: &Arc<AtomicUsize>,
        value: &str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<String, ApiError>> {
        let calls = Arc::clone(calls);
        let value = value.to_string();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(value) }.boxed()
        }
    }

    fn backdate(cache: &QueryCache, key: &str, minutes: i64) {
        let mut state = cache.lock();
        let entry = state.entries.get_mut(key).expect("entry present");
        entry.cached_at = Utc::now() - Duration::minutes(minutes);
    }

    #[test]
    fn test_cached_data_age_display() {
        let mut cached = CachedData::new(1);
        assert_eq!(cached.age_display(), "agora mesmo");

        cached.cached_at = Utc::now() - Duration::minutes(5);
        assert_eq!(cached.age_display(), "há 5 min");

        cached.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(cached.age_display(), "há 2 h");

        cached.cached_at = Utc::now() - Duration::hours(26);
        assert_eq!(cached.age_display(), "há 1 d");
    }

    #[test]
    fn test_cached_data_is_fresh() {
        let mut cached = CachedData::new(1);
        assert!(cached.is_fresh(ttl()));
        assert!(!cached.is_fresh(Duration::zero()));

        cached.cached_at = Utc::now() - Duration::minutes(6);
        assert!(!cached.is_fresh(ttl()));
    }

    #[tokio::test]
    async fn test_second_read_within_ttl_hits_cache() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .fetch("weekly-checkins-u1", ttl(), counting_fetcher(&calls, "a"))
            .await
            .unwrap();
        let second = cache
            .fetch("weekly-checkins-u1", ttl(), counting_fetcher(&calls, "b"))
            .await
            .unwrap();

        assert_eq!(first, "a");
        assert_eq!(second, "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_fetched_again() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch("k", ttl(), counting_fetcher(&calls, "a")).await.unwrap();
        backdate(&cache, "k", DEFAULT_TTL_MINUTES + 1);

        let value = cache.fetch("k", ttl(), counting_fetcher(&calls, "b")).await.unwrap();
        assert_eq!(value, "b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.contains_fresh("k", ttl()));
    }

    #[tokio::test]
    async fn test_refetch_ignores_freshness() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch("k", ttl(), counting_fetcher(&calls, "a")).await.unwrap();
        let value = cache.refetch("k", counting_fetcher(&calls, "b")).await.unwrap();

        assert_eq!(value, "b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get::<String>("k", ttl()), Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_old_value() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch("k", ttl(), counting_fetcher(&calls, "a")).await.unwrap();

        let err = cache
            .refetch::<String, _, _>("k", || async {
                Err(ApiError::ServerError("boom".to_string()))
            })
            .await
            .unwrap_err();

        assert!(err.message().contains("boom"));
        assert_eq!(cache.get::<String>("k", ttl()), Some("a".to_string()));
    }

    #[tokio::test]
    async fn test_failed_fetch_caches_nothing() {
        let cache = QueryCache::new();
        let result = cache
            .fetch::<String, _, _>("k", ttl(), || async { Err(ApiError::Unauthorized) })
            .await;

        assert!(result.is_err());
        assert!(cache.is_empty());
        assert!(!cache.is_fetching("k"));
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.fetch("k", ttl(), counting_fetcher(&calls, "a")),
            cache.fetch("k", ttl(), counting_fetcher(&calls, "b")),
        );

        assert_eq!(a.unwrap(), "a");
        assert_eq!(b.unwrap(), "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_superseded_fetch_does_not_overwrite_refetch() {
        let cache = QueryCache::new();
        let (release, gate) = oneshot::channel::<()>();

        let slow = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .fetch::<String, _, _>("k", ttl(), move || async move {
                        let _ = gate.await;
                        Ok("old".to_string())
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert!(cache.is_fetching("k"));

        let fresh = cache
            .refetch::<String, _, _>("k", || async { Ok("new".to_string()) })
            .await
            .unwrap();
        assert_eq!(fresh, "new");

        release.send(()).unwrap();
        assert_eq!(slow.await.unwrap().unwrap(), "old");
        assert_eq!(cache.get::<String>("k", ttl()), Some("new".to_string()));
    }

    #[tokio::test]
    async fn test_overlapping_refetch_failure_keeps_old_value() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch("k", ttl(), counting_fetcher(&calls, "old")).await.unwrap();
        let (release, gate) = oneshot::channel::<()>();

        let first = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .refetch::<String, _, _>("k", move || async move {
                        let _ = gate.await;
                        Ok("newer".to_string())
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert!(cache.is_fetching("k"));
        assert_eq!(cache.get::<String>("k", ttl()), None);

        let err = cache
            .refetch::<String, _, _>("k", || async {
                Err(ApiError::ServerError("boom".to_string()))
            })
            .await
            .unwrap_err();
        assert!(err.message().contains("boom"));
        assert_eq!(cache.get::<String>("k", ttl()), Some("old".to_string()));

        // The first refetch was superseded, so its value is not published
        release.send(()).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), "newer");
        assert_eq!(cache.get::<String>("k", ttl()), Some("old".to_string()));
        assert!(!cache.is_fetching("k"));
    }

    #[tokio::test]
    async fn test_fetch_joining_failed_refetch_gets_error_and_old_value_stays() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch("k", ttl(), counting_fetcher(&calls, "old")).await.unwrap();
        let (release, gate) = oneshot::channel::<()>();

        let refetch = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .refetch::<String, _, _>("k", move || async move {
                        let _ = gate.await;
                        Err(ApiError::ServerError("down".to_string()))
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;

        let joined = {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move { cache.fetch("k", ttl(), counting_fetcher(&calls, "unused")).await })
        };
        tokio::task::yield_now().await;

        release.send(()).unwrap();
        let refetch_err = refetch.await.unwrap().unwrap_err();
        let joined_err = joined.await.unwrap().unwrap_err();

        assert!(refetch_err.message().contains("down"));
        assert_eq!(joined_err, refetch_err);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get::<String>("k", ttl()), Some("old".to_string()));
    }

    #[tokio::test]
    async fn test_fetcher_may_read_the_cache() {
        let cache = QueryCache::new();
        let reader = cache.clone();

        let seen = cache
            .fetch::<bool, _, _>("k", ttl(), move || {
                let fetching = reader.is_fetching("k");
                async move { Ok(fetching) }
            })
            .await
            .unwrap();
        assert!(!seen);

        let reader = cache.clone();
        let age = cache
            .refetch::<bool, _, _>("k", move || {
                let has_age = reader.age_display("k").is_some();
                async move { Ok(has_age) }
            })
            .await
            .unwrap();
        assert!(age);
    }

    #[tokio::test]
    async fn test_age_display_by_key() {
        let cache = QueryCache::new();
        assert_eq!(cache.age_display("k"), None);

        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch("k", ttl(), counting_fetcher(&calls, "a")).await.unwrap();
        assert_eq!(cache.age_display("k").as_deref(), Some("agora mesmo"));

        backdate(&cache, "k", 7);
        assert_eq!(cache.age_display("k").as_deref(), Some("há 7 min"));
    }

    #[tokio::test]
    async fn test_invalidate_forces_next_fetch() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch("k", ttl(), counting_fetcher(&calls, "a")).await.unwrap();
        cache.invalidate("k");
        assert!(!cache.contains_fresh("k", ttl()));

        cache.fetch("k", ttl(), counting_fetcher(&calls, "b")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_miss() {
        let cache = QueryCache::new();
        cache
            .fetch::<u32, _, _>("k", ttl(), || async { Ok(7) })
            .await
            .unwrap();

        assert_eq!(cache.get::<String>("k", ttl()), None);
        assert_eq!(cache.get::<u32>("k", ttl()), Some(7));
    }
}
