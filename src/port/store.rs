//! Persistence port consumed by the cached store.

use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;

use crate::error::Result;

/// Storage operations for one entity type.
///
/// `load` must be safe to call more than once for the same key: the cache may
/// reload an entity at any time after an invalidation or TTL expiry.
pub trait Repository: Send + Sync + 'static {
    /// Key identifying one stored entity.
    type Key: Clone + Eq + Hash + Display + Send + Sync + 'static;

    /// The stored entity.
    type Value: Clone + Send + Sync + 'static;

    /// Read an entity from storage.
    fn load(&self, key: &Self::Key) -> impl Future<Output = Result<Self::Value>> + Send;

    /// Write an entity, replacing it if it exists.
    fn persist(
        &self,
        key: &Self::Key,
        value: &Self::Value,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete an entity. Returns whether anything was removed.
    fn remove(&self, key: &Self::Key) -> impl Future<Output = Result<bool>> + Send;
}
