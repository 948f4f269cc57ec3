//! Scenelock - concurrent data access for scene storage backends.
//!
//! Services that keep scenes, items and conversation history on disk all need
//! the same two pieces of infrastructure, and this crate provides both:
//!
//! - **Keyed read-through caching** - a per-entity reader/writer lock, a TTL
//!   cache and double-checked loading so concurrent readers of a cold key
//!   trigger exactly one load. Writers invalidate after persisting.
//! - **Progress tracking** - per-job state with bounded, drop-on-full
//!   subscriber queues and a one-shot completion signal, owned by a registry
//!   that sweeps finished and abandoned jobs.
//!
//! # Modules
//!
//! - [`domain`] - Identifiers and progress value types
//! - [`port`] - The [`port::Repository`] trait persistence layers implement
//! - [`application::cache`] - Lock registry, TTL cache, read-through cache, cached store
//! - [`application::progress`] - Progress tracker and registry
//! - [`adapter`] - In-memory repository
//! - [`infrastructure::config`] - TOML configuration and logging setup
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use scenelock::application::cache::ReadThroughCache;
//! use scenelock::infrastructure::config::CacheConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cache: ReadThroughCache<String, String> = ReadThroughCache::new(CacheConfig::default())?;
//! let scene = cache
//!     .get(&"tavern".to_string(), |key| async move {
//!         tokio::fs::read_to_string(format!("scenes/{key}.json")).await
//!     })
//!     .await?;
//! # let _ = scene;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
