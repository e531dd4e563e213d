//! Persisted re-indexing queue.
//!
//! Producers record change events through [`IndexEventQueue`]; a single
//! background worker drains the [`QueueStore`], coalesces each content item's
//! events into one [`EffectiveOperation`] and applies it to the search index.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use indexq_core::queue::{ActionType, IndexEventQueue, QueueEvent, SqliteQueueStore};
//! use indexq_core::search::FtsIndexer;
//! # fn demo(
//! #     loader: Arc<dyn indexq_core::content::ContentLoader>,
//! #     catalog: Arc<dyn indexq_core::content::ContentTypeCatalog>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteQueueStore::open(std::path::Path::new("queue.db"))?);
//! let indexer = Arc::new(FtsIndexer::open(std::path::Path::new("index.db"))?);
//!
//! let queue = IndexEventQueue::builder(store, indexer, loader, catalog).build();
//! queue.start()?;
//! queue.enqueue(QueueEvent::new(10, 3, ActionType::Update).with_revision(1))?;
//! queue.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod coalesce;
pub mod indexability;
pub mod schema;
pub mod service;
pub mod sqlite;
pub mod store;
pub mod types;
mod worker;

pub use coalesce::{Coalesced, EffectiveOperation, coalesce};
pub use indexability::IndexabilityCheck;
pub use schema::{SCHEMA_VERSION, SchemaError};
pub use service::{IndexEventQueue, QueueBuilder, QueueError};
pub use sqlite::SqliteQueueStore;
pub use store::{QueueStore, StoreError};
pub use types::{
    ActionType, ChildId, ContentId, ContentTypeId, DEFAULT_PRIORITY, Identity,
    IndexItemResult, QueueEvent, QueueId, QueueItem, QueueStatus, REINDEX_PRIORITY,
    RevisionId, RowId, RowKey,
};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
