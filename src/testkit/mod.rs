//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`loader`] - Instrumented loaders that count calls and can be made slow.
//! - [`config`] - Canonical test configurations with short windows.

pub mod config;
pub mod loader;
