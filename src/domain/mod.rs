//! Domain types shared by the cache and progress layers.

pub mod id;
pub mod progress;

pub use id::TaskId;
pub use progress::{ProgressState, ProgressStatus, ProgressUpdate};
