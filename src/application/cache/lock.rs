//! Per-key reader/writer locks.
//!
//! Every cache key maps to one [`KeyLock`]. Two callers asking for the same key
//! always get the same lock instance, even when both are the first to ask.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

/// The lock guarding one key's cache entry.
pub type KeyLock = Arc<RwLock<()>>;

/// How keys are mapped onto locks.
#[derive(Debug)]
enum Locks<K: Eq + Hash> {
    /// One lock per distinct key, created on first use and never removed.
    PerKey(DashMap<K, KeyLock>),
    /// A fixed pool of locks; each key hashes to one of them.
    Sharded(Box<[KeyLock]>),
}

/// Registry handing out the lock for a key.
///
/// The per-key registry only grows. That is fine when the set of keys is
/// bounded over the process lifetime (scene ids, item ids). Use
/// [`LockRegistry::sharded`] when it is not.
#[derive(Debug)]
pub struct LockRegistry<K: Eq + Hash> {
    locks: Locks<K>,
}

impl<K> LockRegistry<K>
where
    K: Clone + Eq + Hash,
{
    /// One lock per key. Full parallelism across keys, unbounded growth.
    #[must_use]
    pub fn per_key() -> Self {
        Self {
            locks: Locks::PerKey(DashMap::new()),
        }
    }

    /// A fixed pool of `shards` locks.
    ///
    /// Memory stays bounded; distinct keys that hash to the same shard
    /// serialize against each other. A shard count of 0 is treated as 1.
    ///
    /// The locks are not reentrant. A task holding a shard's write lock that
    /// acquires another key on the same shard deadlocks, so a cache loader
    /// must not read through the same sharded cache.
    #[must_use]
    pub fn sharded(shards: usize) -> Self {
        let locks = (0..shards.max(1))
            .map(|_| Arc::new(RwLock::new(())))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            locks: Locks::Sharded(locks),
        }
    }

    /// Build a registry from an optional shard count.
    #[must_use]
    pub fn from_shards(shards: Option<usize>) -> Self {
        shards.map_or_else(Self::per_key, Self::sharded)
    }

    /// Get the lock for `key`, creating it if this is the first request.
    pub fn acquire(&self, key: &K) -> KeyLock {
        match &self.locks {
            Locks::PerKey(map) => {
                if let Some(lock) = map.get(key) {
                    return Arc::clone(lock.value());
                }
                // entry() holds the shard write lock, so only one insert can win
                Arc::clone(
                    map.entry(key.clone())
                        .or_insert_with(|| Arc::new(RwLock::new(())))
                        .value(),
                )
            }
            Locks::Sharded(locks) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                let idx = (hasher.finish() % locks.len() as u64) as usize;
                Arc::clone(&locks[idx])
            }
        }
    }

    /// Number of lock instances currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.locks {
            Locks::PerKey(map) => map.len(),
            Locks::Sharded(locks) => locks.len(),
        }
    }

    /// Returns true if no per-key lock has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
