//! Timestamped cache entries and the TTL map that owns them.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

/// A cached value and the moment it was stored.
///
/// Entries are replaced wholesale on refresh, never mutated in place.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    value: V,
    cached_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            cached_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[must_use]
    pub fn cached_at(&self) -> Instant {
        self.cached_at
    }

    /// An entry is fresh while `now - cached_at < ttl`.
    #[must_use]
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.cached_at) < ttl
    }
}

/// Map from key to timestamped value with a fixed TTL.
///
/// Expired entries are treated as absent by [`TtlCache::get_fresh`] even
/// while they still occupy memory; [`TtlCache::sweep_expired`] reclaims them.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a copy of the value if present and not expired.
    #[must_use]
    pub fn get_fresh(&self, key: &K) -> Option<V> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;

        if !entry.is_fresh(self.ttl, Instant::now()) {
            return None;
        }

        Some(entry.value.clone())
    }

    /// Store `value` under `key` with a fresh timestamp, replacing any entry.
    pub fn insert(&self, key: K, value: V) {
        self.entries.write().insert(key, CacheEntry::new(value));
    }

    /// Remove the entry for `key`. Returns whether an entry was present.
    pub fn remove(&self, key: &K) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Remove every entry. Returns count removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Drop every expired entry. Returns count removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(ttl, now));
        before - entries.len()
    }

    /// Number of physically stored entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
