//! Progress reporting for long-running jobs.
//!
//! - [`tracker::ProgressTracker`]: state, subscribers and the done signal for one job
//! - [`registry::ProgressRegistry`]: trackers by task id, with expiry sweeps

pub mod registry;
pub mod tracker;

pub use registry::ProgressRegistry;
pub use tracker::{ProgressSubscription, ProgressTracker};
