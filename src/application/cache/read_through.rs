//! Read-through cache with per-key single-flight loading.
//!
//! ```text
//! get(K, loader)
//!   │
//!   ├─► lock(K).read()  ── fresh? ──► return cached
//!   │
//!   └─► lock(K).write() ── fresh? ──► return cached   (another caller loaded it)
//!                          │
//!                          └─► loader(K) ── Ok  ──► store {value, now}, return
//!                                        └─ Err ──► return Err, cache untouched
//! ```
//!
//! Holding the key's write lock across the loader is what collapses concurrent
//! misses into one load: every other caller for that key queues on the lock
//! and then hits the double-check. Keys never share a lock unless the cache
//! was built with lock shards.

use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::entry::TtlCache;
use super::lock::LockRegistry;
use super::stats::{CacheCounters, CacheStats};
use crate::application::sweep::Sweeper;
use crate::error::ConfigError;
use crate::infrastructure::config::CacheConfig;

/// TTL cache in front of an arbitrary async loader.
pub struct ReadThroughCache<K: Eq + Hash, V> {
    locks: LockRegistry<K>,
    entries: TtlCache<K, V>,
    counters: CacheCounters,
    config: CacheConfig,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<K, V> ReadThroughCache<K, V>
where
    K: Clone + Eq + Hash + Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache from configuration. The sweep is not started.
    ///
    /// Fails if `config` does not validate, for example a zero TTL or a zero
    /// sweep interval.
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            locks: LockRegistry::from_shards(config.lock_shards),
            entries: TtlCache::new(config.ttl()),
            counters: CacheCounters::default(),
            config,
            sweeper: Mutex::new(None),
        })
    }

    /// Return the cached value for `key`, loading it on a miss.
    ///
    /// For one key, at most one `loader` call is in flight at a time and
    /// callers that waited on it observe its result. Loader errors are
    /// returned unchanged and nothing is cached for them.
    pub async fn get<F, Fut, E>(&self, key: &K, loader: F) -> Result<V, E>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
    {
        let lock = self.locks.acquire(key);

        {
            let _shared = lock.read().await;
            if let Some(value) = self.entries.get_fresh(key) {
                CacheCounters::incr(&self.counters.hits);
                return Ok(value);
            }
        }

        let _exclusive = lock.write().await;

        if let Some(value) = self.entries.get_fresh(key) {
            CacheCounters::incr(&self.counters.hits);
            debug!(key = %key, "Cache filled while waiting for write lock");
            return Ok(value);
        }

        CacheCounters::incr(&self.counters.misses);
        debug!(key = %key, "Cache miss, loading");

        match loader(key.clone()).await {
            Ok(value) => {
                self.entries.insert(key.clone(), value.clone());
                CacheCounters::incr(&self.counters.loads);
                Ok(value)
            }
            Err(e) => {
                CacheCounters::incr(&self.counters.load_failures);
                warn!(key = %key, error = %e, "Cache load failed");
                Err(e)
            }
        }
    }

    /// Return the cached value without loading. Expired entries count as absent.
    pub async fn peek(&self, key: &K) -> Option<V> {
        let lock = self.locks.acquire(key);
        let _shared = lock.read().await;
        self.entries.get_fresh(key)
    }

    /// Drop the cached value for `key` so the next read reloads it.
    ///
    /// Write paths call this after their persist succeeds and before
    /// returning. Invalidating an absent key is a no-op.
    pub async fn invalidate(&self, key: &K) {
        let lock = self.locks.acquire(key);
        let _exclusive = lock.write().await;

        if self.entries.remove(key) {
            CacheCounters::incr(&self.counters.invalidations);
            debug!(key = %key, "Cache entry invalidated");
        }
    }

    /// Drop every cached value. Returns count removed.
    ///
    /// Does not take per-key locks; a load in flight will still store its
    /// result afterwards.
    pub fn invalidate_all(&self) -> usize {
        let removed = self.entries.clear();
        self.counters
            .invalidations
            .fetch_add(removed as u64, std::sync::atomic::Ordering::Relaxed);
        removed
    }

    /// Remove expired entries. Returns count removed.
    pub fn sweep(&self) -> usize {
        let removed = self.entries.sweep_expired();
        self.counters
            .evictions
            .fetch_add(removed as u64, std::sync::atomic::Ordering::Relaxed);
        removed
    }

    /// Start the periodic expiry sweep. Calling it again while running is a no-op.
    ///
    /// The sweep holds only a weak reference to the cache, and dropping the
    /// cache closes the sweep's shutdown channel.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.sweeper.lock();
        if slot.is_some() {
            return;
        }

        let cache = Arc::downgrade(self);
        *slot = Some(Sweeper::spawn(
            "cache",
            self.config.sweep_interval(),
            move || cache.upgrade().map_or(0, |cache| cache.sweep()),
        ));
    }

    /// Stop the periodic sweep and wait for it to exit.
    pub async fn stop(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }
    }

    /// Returns true while the periodic sweep is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Number of stored entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lock instances held by the lock registry.
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cache() -> ReadThroughCache<String, u32> {
        ReadThroughCache::new(CacheConfig::default()).unwrap()
    }

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[tokio::test]
    async fn second_get_is_a_hit() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get(&key("a"), |_| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }

    #[tokio::test]
    async fn loader_error_is_not_cached() {
        let cache = cache();

        let err = cache
            .get(&key("a"), |_| async { Err::<u32, _>("disk on fire".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "disk on fire");
        assert!(cache.is_empty());

        let value = cache
            .get(&key("a"), |_| async { Ok::<_, String>(3) })
            .await
            .unwrap();
        assert_eq!(value, 3);
        assert_eq!(cache.stats().load_failures, 1);
    }

    #[tokio::test]
    async fn loader_receives_the_key() {
        let cache = cache();
        let value = cache
            .get(&key("scene-12"), |k| async move {
                Ok::<_, String>(k.trim_start_matches("scene-").parse().unwrap())
            })
            .await
            .unwrap();
        assert_eq!(value, 12);
    }

    #[tokio::test]
    async fn invalidate_absent_key_is_noop() {
        let cache = cache();
        cache.invalidate(&key("missing")).await;
        assert_eq!(cache.stats().invalidations, 0);
    }

    #[tokio::test]
    async fn peek_does_not_load() {
        let cache = cache();
        assert_eq!(cache.peek(&key("a")).await, None);

        cache
            .get(&key("a"), |_| async { Ok::<_, String>(1) })
            .await
            .unwrap();
        assert_eq!(cache.peek(&key("a")).await, Some(1));
    }

    #[tokio::test]
    async fn invalidate_all_clears_everything() {
        let cache = cache();
        for k in ["a", "b", "c"] {
            cache.get(&key(k), |_| async { Ok::<_, String>(0) }).await.unwrap();
        }

        assert_eq!(cache.invalidate_all(), 3);
        assert!(cache.is_empty());
        assert_eq!(cache.lock_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_counts_evictions() {
        let cache = ReadThroughCache::<String, u32>::new(CacheConfig {
            ttl_secs: 10,
            ..Default::default()
        })
        .unwrap();
        cache.get(&key("a"), |_| async { Ok::<_, String>(0) }).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn background_sweep_removes_expired_entries() {
        let cache = Arc::new(ReadThroughCache::<String, u32>::new(CacheConfig {
            ttl_secs: 10,
            sweep_interval_secs: 5,
            lock_shards: None,
        })
        .unwrap());
        cache.start();
        cache.start();
        assert!(cache.is_running());

        cache.get(&key("a"), |_| async { Ok::<_, String>(0) }).await.unwrap();
        assert_eq!(cache.len(), 1);

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(cache.len(), 0);

        cache.stop().await;
        assert!(!cache.is_running());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let result = ReadThroughCache::<String, u32>::new(CacheConfig {
            ttl_secs: 0,
            ..Default::default()
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "ttl_secs",
                ..
            })
        ));
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let result = ReadThroughCache::<String, u32>::new(CacheConfig {
            ttl_secs: 10,
            sweep_interval_secs: 0,
            lock_shards: None,
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "sweep_interval_secs",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn loader_may_read_other_keys_with_per_key_locks() {
        let cache = cache();

        let value = cache
            .get(&key("outer"), |_| async {
                let inner = cache
                    .get(&key("inner"), |_| async { Ok::<_, String>(1) })
                    .await?;
                Ok::<_, String>(inner + 1)
            })
            .await
            .unwrap();

        assert_eq!(value, 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn nested_read_on_one_shard_blocks() {
        let cache = ReadThroughCache::<String, u32>::new(CacheConfig {
            lock_shards: Some(1),
            ..Default::default()
        })
        .unwrap();

        let outer = key("outer");
        let nested = cache.get(&outer, |_| async {
            cache
                .get(&key("inner"), |_| async { Ok::<_, String>(1) })
                .await
        });
        let result = tokio::time::timeout(Duration::from_secs(5), nested).await;

        assert!(result.is_err());
        assert!(cache.is_empty());
    }
}
