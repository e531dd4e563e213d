//! Configuration loading.

pub mod loader;
pub mod types;
