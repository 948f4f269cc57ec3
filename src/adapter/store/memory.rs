//! In-memory repository implementation for testing.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::port::Repository;

/// In-memory repository that counts loads, for tests and local tooling.
#[derive(Debug)]
pub struct MemoryRepository<K, V> {
    entities: RwLock<HashMap<K, V>>,
    loads: AtomicUsize,
}

impl<K, V> MemoryRepository<K, V>
where
    K: Eq + Hash,
{
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Create a repository pre-populated with `entities`.
    pub fn with_entities(entities: impl IntoIterator<Item = (K, V)>) -> Self {
        let repository = Self::new();
        repository.entities.write().extend(entities);
        repository
    }

    /// Number of times [`Repository::load`] has been called.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash, V> Default for MemoryRepository<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Repository for MemoryRepository<K, V>
where
    K: Clone + Eq + Hash + Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    async fn load(&self, key: &K) -> Result<V> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.entities
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                key: key.to_string(),
            })
    }

    async fn persist(&self, key: &K, value: &V) -> Result<()> {
        self.entities.write().insert(key.clone(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &K) -> Result<bool> {
        Ok(self.entities.write().remove(key).is_some())
    }
}
