//! Registry of progress trackers by task id.
//!
//! Two sweeps keep the registry bounded:
//!
//! - **eviction** drops finished trackers once they have been idle longer
//!   than the retention window
//! - **abandonment** fails running trackers that have been silent longer
//!   than the abandonment window, then drops them
//!
//! Neither sweep holds the registry lock while touching a tracker: candidates
//! are copied out under the read lock, checked under their own lock, and the
//! write lock is taken last and only to delete.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use super::tracker::ProgressTracker;
use crate::application::sweep::Sweeper;
use crate::domain::{ProgressState, ProgressStatus, TaskId};
use crate::error::ConfigError;
use crate::infrastructure::config::ProgressConfig;

/// Owns every live [`ProgressTracker`].
pub struct ProgressRegistry {
    trackers: RwLock<HashMap<TaskId, Arc<ProgressTracker>>>,
    config: ProgressConfig,
    sweepers: Mutex<Vec<Sweeper>>,
}

impl ProgressRegistry {
    /// Create an empty registry. Sweeps are not started.
    ///
    /// Fails if `config` does not validate.
    pub fn new(config: ProgressConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            trackers: RwLock::new(HashMap::new()),
            config,
            sweepers: Mutex::new(Vec::new()),
        })
    }

    /// Return the tracker for `task_id`, creating a running one if none exists.
    pub fn create_tracker(&self, task_id: impl Into<TaskId>) -> Arc<ProgressTracker> {
        let task_id = task_id.into();

        if let Some(tracker) = self.trackers.read().get(&task_id) {
            return Arc::clone(tracker);
        }

        let capacity = self.config.queue_capacity;
        let mut trackers = self.trackers.write();
        let tracker = trackers.entry(task_id.clone()).or_insert_with(|| {
            debug!(task = %task_id, "Tracker created");
            Arc::new(ProgressTracker::new(task_id, capacity))
        });
        Arc::clone(tracker)
    }

    /// Look up a tracker.
    #[must_use]
    pub fn get_tracker(&self, task_id: &TaskId) -> Option<Arc<ProgressTracker>> {
        self.trackers.read().get(task_id).cloned()
    }

    /// Remove a tracker regardless of its state.
    pub fn remove(&self, task_id: &TaskId) -> Option<Arc<ProgressTracker>> {
        self.trackers.write().remove(task_id)
    }

    /// Snapshots of all trackers, ordered by task id.
    #[must_use]
    pub fn list(&self) -> Vec<ProgressState> {
        let mut states: Vec<ProgressState> =
            self.tracked().iter().map(|(_, t)| t.snapshot()).collect();
        states.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        states
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trackers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    /// Drop finished trackers idle for longer than the retention window.
    /// Returns count removed.
    pub fn evict_finished(&self) -> usize {
        let now = Instant::now();
        let retention = self.config.retention();

        let expired: Vec<_> = self
            .tracked()
            .into_iter()
            .filter(|(_, tracker)| {
                tracker.is_done()
                    && now.saturating_duration_since(tracker.last_activity()) > retention
            })
            .collect();

        self.delete(expired)
    }

    /// Fail and drop running trackers silent for longer than the abandonment
    /// window. Returns count removed.
    pub fn fail_abandoned(&self) -> usize {
        let now = Instant::now();
        let abandon_after = self.config.abandon_after();

        let candidates: Vec<_> = self
            .tracked()
            .into_iter()
            .filter(|(_, tracker)| tracker.status() == ProgressStatus::Running)
            .map(|(task_id, tracker)| {
                let idle = now.saturating_duration_since(tracker.last_activity());
                (task_id, tracker, idle)
            })
            .filter(|(_, _, idle)| *idle > abandon_after)
            .collect();

        let mut abandoned = Vec::with_capacity(candidates.len());
        for (task_id, tracker, idle) in candidates {
            // abandon() re-checks the status under the tracker lock
            if tracker.abandon(idle) {
                abandoned.push((task_id, tracker));
            }
        }

        self.delete(abandoned)
    }

    /// Start both sweeps. Calling it again while running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut sweepers = self.sweepers.lock();
        if !sweepers.is_empty() {
            return;
        }

        let registry = Arc::downgrade(self);
        sweepers.push(Sweeper::spawn(
            "progress-eviction",
            self.config.eviction_interval(),
            move || registry.upgrade().map_or(0, |r| r.evict_finished()),
        ));

        let registry = Arc::downgrade(self);
        sweepers.push(Sweeper::spawn(
            "progress-abandonment",
            self.config.abandon_check_interval(),
            move || registry.upgrade().map_or(0, |r| r.fail_abandoned()),
        ));
    }

    /// Stop both sweeps and wait for them to exit.
    pub async fn stop(&self) {
        let sweepers = std::mem::take(&mut *self.sweepers.lock());
        for sweeper in sweepers {
            sweeper.stop().await;
        }
    }

    /// Returns true while the sweeps are running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.sweepers.lock().is_empty()
    }

    fn tracked(&self) -> Vec<(TaskId, Arc<ProgressTracker>)> {
        self.trackers
            .read()
            .iter()
            .map(|(id, tracker)| (id.clone(), Arc::clone(tracker)))
            .collect()
    }

    /// Remove the given trackers, skipping any id that now maps to a
    /// different tracker instance.
    fn delete(&self, doomed: Vec<(TaskId, Arc<ProgressTracker>)>) -> usize {
        if doomed.is_empty() {
            return 0;
        }

        let mut trackers = self.trackers.write();
        let mut removed = 0;
        for (task_id, tracker) in doomed {
            let same = trackers
                .get(&task_id)
                .is_some_and(|current| Arc::ptr_eq(current, &tracker));
            if same {
                trackers.remove(&task_id);
                removed += 1;
            }
        }
        removed
    }
}
