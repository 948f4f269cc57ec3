//! Read-through cache configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

const fn default_ttl_secs() -> u64 {
    300
}

const fn default_sweep_interval_secs() -> u64 {
    120
}

/// Configuration for a [`ReadThroughCache`](crate::application::cache::ReadThroughCache).
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for cached entries in seconds.
    ///
    /// An entry older than this is treated as a miss even before the sweep
    /// removes it. Defaults to 300 (5 minutes).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Interval between background sweeps of expired entries in seconds.
    ///
    /// Sweeping only bounds memory; reads never depend on it. Defaults to 120.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Number of lock shards.
    ///
    /// `None` keeps one lock per key for the life of the process. Setting a
    /// shard count caps lock memory at the cost of unrelated keys sometimes
    /// sharing a lock. With shards, a loader that calls back into the same
    /// cache can deadlock when both keys land on one shard.
    #[serde(default)]
    pub lock_shards: Option<usize>,
}

impl CacheConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ttl_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sweep_interval_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.lock_shards == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "lock_shards",
                reason: "must be greater than 0 when set".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            lock_shards: None,
        }
    }
}
