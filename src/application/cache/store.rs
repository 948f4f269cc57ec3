//! Repository access routed through a read-through cache.

use std::sync::Arc;

use tracing::debug;

use super::read_through::ReadThroughCache;
use crate::error::Result;
use crate::infrastructure::config::CacheConfig;
use crate::port::Repository;

/// A [`Repository`] fronted by a [`ReadThroughCache`].
///
/// Reads go through the cache. Writes go straight to the repository and
/// invalidate the key once the write has succeeded, before returning, so the
/// next read after a write always reloads.
pub struct CachedStore<R: Repository> {
    repository: Arc<R>,
    cache: Arc<ReadThroughCache<R::Key, R::Value>>,
}

impl<R: Repository> CachedStore<R> {
    /// Create a store with its own cache built from `config`.
    pub fn new(repository: Arc<R>, config: CacheConfig) -> Result<Self> {
        let cache = ReadThroughCache::new(config)?;
        Ok(Self::with_cache(repository, Arc::new(cache)))
    }

    /// Create a store over an existing cache.
    pub fn with_cache(repository: Arc<R>, cache: Arc<ReadThroughCache<R::Key, R::Value>>) -> Self {
        Self { repository, cache }
    }

    /// Read an entity, loading it from the repository on a cache miss.
    pub async fn get(&self, key: &R::Key) -> Result<R::Value> {
        let repository = Arc::clone(&self.repository);
        self.cache
            .get(key, move |key| async move { repository.load(&key).await })
            .await
    }

    /// Persist an entity and invalidate its cached copy.
    ///
    /// A failed persist leaves the cache as it was.
    pub async fn save(&self, key: &R::Key, value: &R::Value) -> Result<()> {
        self.repository.persist(key, value).await?;
        self.cache.invalidate(key).await;
        debug!(key = %key, "Entity saved");
        Ok(())
    }

    /// Delete an entity and invalidate its cached copy.
    pub async fn delete(&self, key: &R::Key) -> Result<bool> {
        let removed = self.repository.remove(key).await?;
        self.cache.invalidate(key).await;
        debug!(key = %key, removed, "Entity deleted");
        Ok(removed)
    }

    /// Load an entity, apply `mutate`, persist the result and invalidate.
    ///
    /// The read goes through the cache; the mutated value is returned.
    pub async fn update<F>(&self, key: &R::Key, mutate: F) -> Result<R::Value>
    where
        F: FnOnce(&mut R::Value),
    {
        let mut value = self.get(key).await?;
        mutate(&mut value);
        self.save(key, &value).await?;
        Ok(value)
    }

    /// The underlying cache, for starting its sweep or reading stats.
    #[must_use]
    pub fn cache(&self) -> &Arc<ReadThroughCache<R::Key, R::Value>> {
        &self.cache
    }

    #[must_use]
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }
}
