//! Canonical test configurations.

use crate::infrastructure::config::{CacheConfig, ProgressConfig};

/// Cache config with a 60s TTL and 10s sweep interval.
pub fn short_ttl_cache() -> CacheConfig {
    CacheConfig {
        ttl_secs: 60,
        sweep_interval_secs: 10,
        lock_shards: None,
    }
}

/// Progress config with minute-scale windows and sweeps.
pub fn fast_progress() -> ProgressConfig {
    ProgressConfig {
        queue_capacity: 10,
        retention_secs: 60,
        abandon_after_secs: 120,
        eviction_interval_secs: 15,
        abandon_check_interval_secs: 30,
    }
}
