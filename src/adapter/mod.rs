//! Adapters implementing the crate's ports.

pub mod store;
