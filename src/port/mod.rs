//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! The cache layer never touches storage itself. Persistence layers plug in
//! through [`Repository`], and adapters implement it for concrete backends.

mod store;

pub use store::Repository;
