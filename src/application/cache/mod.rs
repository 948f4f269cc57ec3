//! Keyed read-through caching.
//!
//! - [`lock::LockRegistry`]: one reader/writer lock per key (or per shard)
//! - [`entry::TtlCache`]: timestamped entries with a fixed TTL
//! - [`read_through::ReadThroughCache`]: double-checked, single-flight loading
//! - [`store::CachedStore`]: a [`Repository`](crate::port::Repository) behind the cache

pub mod entry;
pub mod lock;
pub mod read_through;
mod stats;
pub mod store;

pub use entry::{CacheEntry, TtlCache};
pub use lock::{KeyLock, LockRegistry};
pub use read_through::ReadThroughCache;
pub use stats::CacheStats;
pub use store::CachedStore;
