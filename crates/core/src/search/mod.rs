//! Full-text indexer interface and the SQLite FTS5 implementation.

mod fts;

pub use fts::{FtsIndexer, SearchHit};

use std::collections::BTreeSet;

use thiserror::Error;

use crate::content::Fields;
use crate::queue::Identity;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to encode fields: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Indexer unavailable: {0}")]
    Unavailable(String),
}

/// Applies fragment writes to the search index.
///
/// Writes become durable on [`Indexer::commit`]. Deleting a
/// [`Identity::Parent`] removes the parent entry and every child-row entry of
/// that item.
pub trait Indexer: Send + Sync {
    /// Replace the entry for `identity` with `fields`.
    fn update(&self, identity: &Identity, fields: &Fields) -> Result<(), IndexerError>;

    fn delete(&self, identities: &BTreeSet<Identity>) -> Result<(), IndexerError>;

    fn commit(&self) -> Result<(), IndexerError>;

    /// Flush pending writes, optionally optimizing index storage.
    /// The indexer remains usable afterwards.
    fn close(&self, optimize: bool) -> Result<(), IndexerError>;
}
