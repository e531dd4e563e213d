//! Queue service: worker lifecycle and the producer API.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::config::types::QueueConfig;
use crate::content::{ContentLoader, ContentTypeCatalog, ItemLocator, LoaderError};
use crate::notify::{NotificationSink, QueueNotification, TracingSink};
use crate::search::Indexer;

use super::indexability::IndexabilityCheck;
use super::lock;
use super::store::{QueueStore, StoreError};
use super::types::{
    ActionType, ContentTypeId, IndexItemResult, QueueEvent, QueueStatus, REINDEX_PRIORITY,
};
use super::worker::Worker;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("index queue worker is already running")]
    AlreadyRunning,

    #[error("index queue is shutting down")]
    ShuttingDown,

    #[error("Queue store error: {0}")]
    Store(#[from] StoreError),

    #[error("Content loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Failed to spawn queue worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// State shared between producer handles and the worker thread.
pub(super) struct Shared {
    pub(super) store: Arc<dyn QueueStore>,
    pub(super) indexer: Arc<dyn Indexer>,
    pub(super) loader: Arc<dyn ContentLoader>,
    pub(super) sink: Arc<dyn NotificationSink>,
    pub(super) types: IndexabilityCheck,
    pub(super) config: QueueConfig,
    pub(super) shutdown: AtomicBool,
    running: AtomicBool,
    /// Nested pause count; the worker idles while it is non-zero.
    pub(super) pause_count: AtomicUsize,
    /// Bumped by [`IndexEventQueue::clear`]; batches fetched under an older
    /// value are stale.
    pub(super) generation: AtomicU64,
}

impl Shared {
    pub(super) fn notify(&self, notification: QueueNotification) {
        self.sink.notify(&notification);
    }

    pub(super) fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub(super) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(super) fn is_paused(&self) -> bool {
        self.pause_count.load(Ordering::SeqCst) > 0
    }

    fn status(&self) -> QueueStatus {
        if self.is_shutting_down() {
            QueueStatus::ShuttingDown
        } else if !self.running.load(Ordering::SeqCst) {
            QueueStatus::Stopped
        } else if self.is_paused() {
            QueueStatus::Paused
        } else {
            QueueStatus::Running
        }
    }

    fn status_changed(&self) {
        self.notify(QueueNotification::StatusChanged { status: self.status() });
    }
}

/// Builder for [`IndexEventQueue`].
pub struct QueueBuilder {
    store: Arc<dyn QueueStore>,
    indexer: Arc<dyn Indexer>,
    loader: Arc<dyn ContentLoader>,
    catalog: Arc<dyn ContentTypeCatalog>,
    sink: Arc<dyn NotificationSink>,
    config: QueueConfig,
}

impl QueueBuilder {
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn build(self) -> IndexEventQueue {
        let types = IndexabilityCheck::new(
            self.catalog,
            self.config.type_check_attempts,
            self.config.type_check_retry(),
        );
        IndexEventQueue {
            shared: Arc::new(Shared {
                store: self.store,
                indexer: self.indexer,
                loader: self.loader,
                sink: self.sink,
                types,
                config: self.config,
                shutdown: AtomicBool::new(false),
                running: AtomicBool::new(false),
                pause_count: AtomicUsize::new(0),
                generation: AtomicU64::new(0),
            }),
            worker: Arc::new(Mutex::new(None)),
        }
    }
}

/// Handle to the re-indexing queue.
///
/// Cheap to clone; every clone addresses the same queue and worker. The
/// worker keeps running until [`IndexEventQueue::shutdown`] is called.
#[derive(Clone)]
pub struct IndexEventQueue {
    shared: Arc<Shared>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl IndexEventQueue {
    pub fn builder(
        store: Arc<dyn QueueStore>,
        indexer: Arc<dyn Indexer>,
        loader: Arc<dyn ContentLoader>,
        catalog: Arc<dyn ContentTypeCatalog>,
    ) -> QueueBuilder {
        QueueBuilder {
            store,
            indexer,
            loader,
            catalog,
            sink: Arc::new(TracingSink),
            config: QueueConfig::default(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Spawn the worker thread.
    pub fn start(&self) -> Result<(), QueueError> {
        if self.shared.is_shutting_down() {
            return Err(QueueError::ShuttingDown);
        }

        let mut worker = lock(&self.worker);
        if worker.is_some() {
            return Err(QueueError::AlreadyRunning);
        }

        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("index-queue".to_string())
            .spawn(move || Worker::new(shared).run())
            .map_err(|e| {
                self.shared.running.store(false, Ordering::SeqCst);
                QueueError::Spawn(e)
            })?;
        *worker = Some(handle);

        tracing::info!("Index queue started");
        self.shared.status_changed();
        Ok(())
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// In-flight work for the current item is allowed to finish. Repeated or
    /// concurrent calls are no-ops once the queue is stopped.
    pub fn shutdown(&self) {
        let mut worker = lock(&self.worker);
        let Some(handle) = worker.take() else {
            return;
        };

        tracing::info!("Shutting down index queue");
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.status_changed();

        let poll = self.shared.config.shutdown_poll();
        while !handle.is_finished() {
            self.shared.store.shutdown();
            thread::sleep(poll);
        }
        if handle.join().is_err() {
            tracing::error!("Index queue worker panicked");
        }

        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.shutdown.store(false, Ordering::SeqCst);
        tracing::info!("Index queue stopped");
        self.shared.status_changed();
    }

    /// Suspend processing. Returns true if this call paused a running queue.
    ///
    /// Pausing a stopped queue still counts, so a later
    /// [`IndexEventQueue::start`] comes up paused.
    pub fn pause(&self) -> bool {
        let previous = self.shared.pause_count.fetch_add(1, Ordering::SeqCst);
        let transitioned = previous == 0 && self.shared.running.load(Ordering::SeqCst);
        if transitioned {
            tracing::info!("Index queue paused");
            self.shared.status_changed();
        }
        transitioned
    }

    /// Undo one [`IndexEventQueue::pause`]. Returns true if the queue is now
    /// fully resumed.
    pub fn resume(&self) -> bool {
        let previous = self
            .shared
            .pause_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        if previous == 1 && self.shared.running.load(Ordering::SeqCst) {
            tracing::info!("Index queue resumed");
            self.shared.status_changed();
        }
        previous <= 1
    }

    pub fn status(&self) -> QueueStatus {
        self.shared.status()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Producer API
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a change event.
    ///
    /// Events for content types (or child tables) that are not indexable are
    /// dropped without error. Persistence failures are returned.
    pub fn enqueue(&self, event: QueueEvent) -> Result<(), QueueError> {
        let child_id = event.row.map(|r| r.child_id);
        if !self.shared.types.is_indexable(event.content_type_id, child_id) {
            tracing::debug!(
                "Dropping {} event for content {}: type {} not indexable",
                event.action,
                event.content_id,
                event.content_type_id
            );
            return Ok(());
        }

        let queue_id = self.shared.store.save(&event)?;
        tracing::trace!(
            "Queued {} for content {} as {}",
            event.action,
            event.content_id,
            queue_id
        );
        self.shared.notify(QueueNotification::ItemQueued { count: 1 });
        Ok(())
    }

    /// Queue a full reindex of one item.
    pub fn index_item(&self, locator: &ItemLocator) -> Result<IndexItemResult, QueueError> {
        self.index_item_with_commit(locator, true)
    }

    fn index_item_with_commit(
        &self,
        locator: &ItemLocator,
        requires_commit: bool,
    ) -> Result<IndexItemResult, QueueError> {
        let Some(summary) = self.shared.loader.load_summary(locator)? else {
            return Ok(IndexItemResult::NotFound);
        };
        if !self.shared.types.is_indexable(summary.content_type_id, None) {
            return Ok(IndexItemResult::NotIndexable);
        }

        let event = QueueEvent::new(
            summary.content_id.get(),
            summary.content_type_id.get(),
            ActionType::Reindex,
        )
        .with_revision(summary.revision.get())
        .with_priority(REINDEX_PRIORITY)
        .with_requires_commit(requires_commit);

        self.shared.store.save(&event)?;
        self.shared.notify(QueueNotification::ItemQueued { count: 1 });
        Ok(IndexItemResult::Queued)
    }

    /// Queue a reindex of every live item of a content type.
    ///
    /// Returns the number of items queued, or `None` if the type itself is not
    /// indexable. Only the final event requests an index commit.
    pub fn index_content_type(
        &self,
        content_type_id: ContentTypeId,
    ) -> Result<Option<usize>, QueueError> {
        if !self.shared.types.is_indexable(content_type_id, None) {
            return Ok(None);
        }

        let items = self.shared.loader.list_items(content_type_id)?;
        let last = items.len().saturating_sub(1);
        let mut queued = 0;
        for (i, locator) in items.iter().enumerate() {
            if self.index_item_with_commit(locator, i == last)? == IndexItemResult::Queued {
                queued += 1;
            }
        }

        tracing::info!("Queued {} items of content type {} for reindex", queued, content_type_id);
        Ok(Some(queued))
    }

    /// Number of unprocessed events in the store.
    pub fn size(&self) -> Result<u64, QueueError> {
        Ok(self.shared.store.count()?)
    }

    /// Remove every pending event without processing it.
    ///
    /// Groups the worker has already fetched are discarded too; only the item
    /// being applied at the moment of the call runs to completion.
    pub fn clear(&self) -> Result<usize, QueueError> {
        let removed = self.shared.store.delete_all()?;
        // After the delete: a batch fetched in between holds only newer rows,
        // which stay stored and are fetched again.
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if removed > 0 {
            tracing::warn!("Discarded {} pending index queue events", removed);
            self.shared.notify(QueueNotification::ItemProcessed { count: removed });
        }
        Ok(removed)
    }
}
