//! Application services: caching, progress tracking and background sweeps.

pub mod cache;
pub mod progress;
pub mod sweep;

pub use sweep::Sweeper;
