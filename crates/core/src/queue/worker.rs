//! The single background consumer of the queue.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use thiserror::Error;

use crate::content::{ItemLocator, LoadScope, LoadedItem, LoaderError};
use crate::notify::QueueNotification;
use crate::search::IndexerError;

use super::coalesce::coalesce;
use super::service::Shared;
use super::types::{ContentId, ContentTypeId, Identity, QueueEvent, QueueId, QueueItem, RevisionId};

#[derive(Debug, Error)]
enum ApplyError {
    #[error("content type {0} is not indexable")]
    InvalidContentType(ContentTypeId),

    #[error("content item {0} could not be loaded")]
    ItemNotFound(ContentId),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Indexer(#[from] IndexerError),

    #[error("indexing panicked")]
    Panicked,
}

/// Queue rows for one content id, in queue order.
struct Group {
    content_id: ContentId,
    content_type_id: ContentTypeId,
    items: Vec<QueueItem>,
}

/// Group a fetched batch by content id, ordered by each group's first row.
fn group_by_content(items: Vec<QueueItem>) -> VecDeque<Group> {
    let mut groups: VecDeque<Group> = VecDeque::new();
    let mut positions: HashMap<ContentId, usize> = HashMap::new();

    for item in items {
        match positions.get(&item.content_id()) {
            Some(&pos) => groups[pos].items.push(item),
            None => {
                positions.insert(item.content_id(), groups.len());
                groups.push_back(Group {
                    content_id: item.content_id(),
                    content_type_id: item.content_type_id(),
                    items: vec![item],
                });
            }
        }
    }

    groups
}

pub(super) struct Worker {
    shared: Arc<Shared>,
    pending: VecDeque<Group>,
    /// Writes were applied without a commit.
    uncommitted: bool,
    /// Writes were applied since the last optimize pass.
    dirty: bool,
    /// Queue generation `pending` was fetched under.
    generation: u64,
}

impl Worker {
    pub(super) fn new(shared: Arc<Shared>) -> Self {
        Self { shared, pending: VecDeque::new(), uncommitted: false, dirty: false, generation: 0 }
    }

    pub(super) fn run(mut self) {
        tracing::debug!("Index queue worker started");

        while !self.shared.is_shutting_down() {
            if self.shared.is_paused() {
                thread::sleep(self.shared.config.pause_poll());
                continue;
            }

            self.discard_cleared();
            match self.pending.pop_front() {
                Some(group) => self.process_group(group),
                None => self.fetch(),
            }
        }

        self.flush();
        if let Err(e) = self.shared.indexer.close(false) {
            tracing::error!("Failed to close indexer: {}", e);
        }
        tracing::debug!("Index queue worker exited");
    }

    /// Drop fetched groups whose rows were removed by a clear.
    fn discard_cleared(&mut self) {
        let current = self.shared.generation();
        if current == self.generation {
            return;
        }
        if !self.pending.is_empty() {
            tracing::debug!("Queue cleared, discarding {} fetched groups", self.pending.len());
            self.pending.clear();
        }
        self.generation = current;
    }

    fn fetch(&mut self) {
        let generation = self.shared.generation();
        let batch = match self.shared.store.load_batch(self.shared.config.batch_size) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!("Failed to load queue batch: {}", e);
                thread::sleep(self.shared.config.pause_poll());
                return;
            }
        };

        if !batch.is_empty() {
            tracing::debug!("Fetched {} queued events", batch.len());
            self.pending = group_by_content(batch);
            self.generation = generation;
            return;
        }

        self.flush();
        let woke = self.shared.store.wait_for_next(self.shared.config.idle_timeout());
        if !woke && self.dirty && !self.shared.is_shutting_down() {
            tracing::debug!("Index queue idle, optimizing index");
            match self.shared.indexer.close(true) {
                Ok(()) => self.dirty = false,
                Err(e) => tracing::error!("Index optimize failed: {}", e),
            }
        }
    }

    fn flush(&mut self) {
        if !self.uncommitted {
            return;
        }
        match self.shared.indexer.commit() {
            Ok(()) => self.uncommitted = false,
            Err(e) => tracing::error!("Index commit failed: {}", e),
        }
    }

    fn process_group(&mut self, group: Group) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.apply(&group)))
            .unwrap_or(Err(ApplyError::Panicked));

        let removed = match outcome {
            Ok(committed) => {
                self.uncommitted = !committed;
                self.dirty = true;
                tracing::debug!(
                    "Indexed content {} ({} events)",
                    group.content_id,
                    group.items.len()
                );
                let ids: Vec<QueueId> = group.items.iter().map(|i| i.queue_id).collect();
                self.shared.store.delete_by_ids(&ids)
            }
            Err(ApplyError::InvalidContentType(type_id)) => {
                tracing::warn!(
                    "Content type {} is no longer indexable, purging its queued events",
                    type_id
                );
                self.pending.retain(|g| g.content_type_id != type_id);
                self.shared.store.delete_by_content_type_id(type_id)
            }
            Err(e) => {
                // partial writes may precede the failure
                self.uncommitted = true;
                tracing::error!("Failed to index content {}: {}", group.content_id, e);
                self.shared.store.delete_by_content_id(group.content_id)
            }
        };

        match removed {
            Ok(0) => {}
            Ok(count) => self.shared.notify(QueueNotification::ItemProcessed { count }),
            Err(e) => tracing::error!(
                "Failed to remove queue events for content {}: {}",
                group.content_id,
                e
            ),
        }
    }

    /// Apply one group's coalesced operation. Returns whether the index was
    /// committed.
    fn apply(&self, group: &Group) -> Result<bool, ApplyError> {
        let shared = &self.shared;
        if !shared.types.is_indexable(group.content_type_id, None) {
            return Err(ApplyError::InvalidContentType(group.content_type_id));
        }

        let events = self.resolve_revisions(group)?;
        let coalesced = coalesce(&events);
        let op = coalesced.operation;
        let cid = group.content_id;
        let locator = ItemLocator { content_id: cid, revision: coalesced.revision };

        if op.is_whole_item() {
            shared.indexer.delete(&BTreeSet::from([Identity::parent(cid)]))?;
            if op.reindex {
                let item = shared
                    .loader
                    .load_item(&locator, &LoadScope::Full)?
                    .ok_or(ApplyError::ItemNotFound(cid))?;
                self.submit(cid, item)?;
            }
        } else {
            if !op.child_deletes.is_empty() {
                let rows: BTreeSet<Identity> =
                    op.child_deletes.iter().map(|row| Identity::child_row(cid, *row)).collect();
                shared.indexer.delete(&rows)?;
            }
            if op.needs_load() {
                let scope =
                    LoadScope::Partial { parent: op.parent_update, rows: op.child_updates };
                let item = shared
                    .loader
                    .load_item(&locator, &scope)?
                    .ok_or(ApplyError::ItemNotFound(cid))?;
                self.submit(cid, item)?;
            }
        }

        if group.items.iter().any(|i| i.event.requires_commit) {
            shared.indexer.commit()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Fill in revisions that were unknown at enqueue time.
    fn resolve_revisions(&self, group: &Group) -> Result<Vec<QueueEvent>, LoaderError> {
        let mut current: Option<RevisionId> = None;
        let mut events = Vec::with_capacity(group.items.len());

        for item in &group.items {
            let mut event = item.event.clone();
            if event.revision_id.is_none() {
                let rev = match current {
                    Some(rev) => rev,
                    None => {
                        let rev = self
                            .shared
                            .loader
                            .current_revision(group.content_id)?
                            .unwrap_or(RevisionId::MISSING);
                        current = Some(rev);
                        rev
                    }
                };
                event.revision_id = Some(rev);
            }
            events.push(event);
        }

        Ok(events)
    }

    /// Submit every loaded fragment to the indexer.
    fn submit(&self, cid: ContentId, item: LoadedItem) -> Result<(), ApplyError> {
        let shared = &self.shared;
        if let Some(mut fields) = item.fields {
            fields.extend(shared.loader.load_system_fields(cid)?);
            shared.indexer.update(&Identity::parent(cid), &fields)?;
        }
        for child in item.children {
            shared.indexer.update(&Identity::child_row(cid, child.row), &child.fields)?;
        }
        Ok(())
    }
}
