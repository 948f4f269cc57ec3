//! Progress value types for long-running jobs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::TaskId;

/// Lifecycle status of a tracked job.
///
/// `Running` is the only non-terminal status. A job leaves it at most once,
/// for either `Completed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Running,
    Completed,
    Failed,
}

impl ProgressStatus {
    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message delivered to progress subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Percentage in `0..=100`.
    pub progress: u8,
    pub message: String,
    pub status: ProgressStatus,
}

impl ProgressUpdate {
    /// Returns true if this is the last update a subscriber will receive.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Point-in-time view of a tracked job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub task_id: TaskId,
    /// Percentage in `0..=100`, never decreasing while the job runs.
    pub progress: u8,
    pub message: String,
    pub status: ProgressStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressState {
    /// Create the initial state of a freshly started job.
    pub fn started(task_id: TaskId) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            progress: 0,
            message: String::new(),
            status: ProgressStatus::Running,
            started_at: now,
            updated_at: now,
        }
    }

    /// The subscriber-facing portion of this state.
    #[must_use]
    pub fn to_update(&self) -> ProgressUpdate {
        ProgressUpdate {
            progress: self.progress,
            message: self.message.clone(),
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!ProgressStatus::Running.is_terminal());
        assert!(ProgressStatus::Completed.is_terminal());
        assert!(ProgressStatus::Failed.is_terminal());
    }

    #[test]
    fn started_state_is_running_at_zero() {
        let state = ProgressState::started(TaskId::new("t"));
        assert_eq!(state.progress, 0);
        assert_eq!(state.status, ProgressStatus::Running);
        assert!(state.message.is_empty());
        assert_eq!(state.started_at, state.updated_at);
    }

    #[test]
    fn to_update_copies_visible_fields() {
        let mut state = ProgressState::started(TaskId::new("t"));
        state.progress = 40;
        state.message = "rendering".into();

        let update = state.to_update();
        assert_eq!(update.progress, 40);
        assert_eq!(update.message, "rendering");
        assert_eq!(update.status, ProgressStatus::Running);
        assert!(!update.is_terminal());
    }
}
