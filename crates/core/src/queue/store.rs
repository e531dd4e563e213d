//! Durable storage interface for pending queue items.

use std::time::Duration;

use thiserror::Error;

use super::schema::SchemaError;
use super::types::{ContentId, ContentTypeId, QueueEvent, QueueId, QueueItem};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Failed to encode binary field list: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid queue row {queue_id}: {reason}")]
    InvalidRow { queue_id: i64, reason: String },

    #[error("Queue store unavailable: {0}")]
    Unavailable(String),
}

/// Append/scan/delete storage for pending queue items.
///
/// Implementations must assign unique, increasing queue ids under concurrent
/// inserts and must allow `count` and `load_batch` while inserts occur.
pub trait QueueStore: Send + Sync {
    /// Persist an event and return its assigned queue id.
    fn save(&self, event: &QueueEvent) -> Result<QueueId, StoreError>;

    /// Load up to `max_count` items ordered by ascending queue id.
    fn load_batch(&self, max_count: usize) -> Result<Vec<QueueItem>, StoreError>;

    /// Returns the number of rows removed.
    fn delete_by_ids(&self, ids: &[QueueId]) -> Result<usize, StoreError>;

    fn delete_by_content_id(&self, content_id: ContentId) -> Result<usize, StoreError>;

    fn delete_by_content_type_id(
        &self,
        content_type_id: ContentTypeId,
    ) -> Result<usize, StoreError>;

    fn delete_all(&self) -> Result<usize, StoreError>;

    /// Number of unprocessed items.
    fn count(&self) -> Result<u64, StoreError>;

    /// Block until an item is available or `timeout` elapses.
    /// Returns true if items may be available.
    fn wait_for_next(&self, timeout: Duration) -> bool;

    /// Wake any thread blocked in [`QueueStore::wait_for_next`].
    fn shutdown(&self);
}
