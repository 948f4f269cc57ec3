//! Progress registry configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

const fn default_queue_capacity() -> usize {
    10
}

const fn default_retention_secs() -> u64 {
    30 * 60
}

const fn default_abandon_after_secs() -> u64 {
    2 * 60 * 60
}

const fn default_eviction_interval_secs() -> u64 {
    5 * 60
}

const fn default_abandon_check_interval_secs() -> u64 {
    10 * 60
}

/// Configuration for a [`ProgressRegistry`](crate::application::progress::ProgressRegistry).
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressConfig {
    /// Capacity of each subscriber queue.
    ///
    /// Updates for a subscriber whose queue is full are dropped. Defaults to 10.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long a finished tracker stays queryable, in seconds.
    ///
    /// Defaults to 1800 (30 minutes).
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Silence after which a running tracker is failed as abandoned, in seconds.
    ///
    /// Defaults to 7200 (2 hours).
    #[serde(default = "default_abandon_after_secs")]
    pub abandon_after_secs: u64,

    /// Interval between sweeps of finished trackers, in seconds. Defaults to 300.
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,

    /// Interval between sweeps for abandoned trackers, in seconds. Defaults to 600.
    #[serde(default = "default_abandon_check_interval_secs")]
    pub abandon_check_interval_secs: u64,
}

impl ProgressConfig {
    #[must_use]
    pub const fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    #[must_use]
    pub const fn abandon_after(&self) -> Duration {
        Duration::from_secs(self.abandon_after_secs)
    }

    #[must_use]
    pub const fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }

    #[must_use]
    pub const fn abandon_check_interval(&self) -> Duration {
        Duration::from_secs(self.abandon_check_interval_secs)
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, bool); 5] = [
            ("queue_capacity", self.queue_capacity == 0),
            ("retention_secs", self.retention_secs == 0),
            ("abandon_after_secs", self.abandon_after_secs == 0),
            ("eviction_interval_secs", self.eviction_interval_secs == 0),
            (
                "abandon_check_interval_secs",
                self.abandon_check_interval_secs == 0,
            ),
        ];

        for (field, is_zero) in checks {
            if is_zero {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            retention_secs: default_retention_secs(),
            abandon_after_secs: default_abandon_after_secs(),
            eviction_interval_secs: default_eviction_interval_secs(),
            abandon_check_interval_secs: default_abandon_check_interval_secs(),
        }
    }
}
