//! Cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters updated atomically by cache operations.
#[derive(Debug, Default)]
pub(super) struct CacheCounters {
    /// Reads served from a fresh entry.
    pub(super) hits: AtomicU64,
    /// Reads that found no fresh entry after the double-check.
    pub(super) misses: AtomicU64,
    /// Loader calls that succeeded and were stored.
    pub(super) loads: AtomicU64,
    /// Loader calls that returned an error.
    pub(super) load_failures: AtomicU64,
    /// Explicit invalidations that removed an entry.
    pub(super) invalidations: AtomicU64,
    /// Entries removed by the expiry sweep.
    pub(super) evictions: AtomicU64,
}

impl CacheCounters {
    pub(super) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub invalidations: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of reads served from cache, or 0 with no reads.
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}
