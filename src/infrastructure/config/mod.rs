//! Infrastructure configuration modules.

pub mod cache;
pub mod logging;
pub mod progress;
pub mod settings;

pub use cache::CacheConfig;
pub use logging::LoggingConfig;
pub use progress::ProgressConfig;
pub use settings::Config;
