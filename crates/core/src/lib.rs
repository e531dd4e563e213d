//! Persisted, asynchronous re-indexing queue.
//!
//! Content mutations are recorded as durable queue events and applied to a
//! full-text index by a single background worker that coalesces events per
//! content item, isolates failures and survives restarts.

pub mod config;
pub mod content;
pub mod notify;
pub mod queue;
pub mod search;

pub use queue::{IndexEventQueue, QueueError, QueueEvent, QueueStatus};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
