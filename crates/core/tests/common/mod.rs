//! Shared in-memory collaborators for queue integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use indexq_core::config::types::QueueConfig;
use indexq_core::content::{
    ChildRowFields, ContentLoader, ContentTypeCatalog, ContentTypeInfo, Fields,
    ItemLocator, ItemSummary, LoadScope, LoadedItem, LoaderError,
};
use indexq_core::notify::{NotificationSink, QueueNotification};
use indexq_core::queue::{
    ChildId, ContentId, ContentTypeId, Identity, IndexEventQueue, QueueStore, RevisionId,
    QueueEvent, QueueId, QueueItem, RowKey, SqliteQueueStore, StoreError,
};
use indexq_core::search::{Indexer, IndexerError};

pub const ARTICLE: i64 = 3;
pub const GALLERY: i64 = 8;

pub fn fields(pairs: &[(&str, &str)]) -> Fields {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

pub fn fast_config() -> QueueConfig {
    QueueConfig {
        batch_size: 100,
        idle_timeout_ms: 50,
        pause_poll_ms: 5,
        shutdown_poll_ms: 5,
        type_check_attempts: 5,
        type_check_retry_ms: 1,
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

// ─────────────────────────────────────────────────────────────────────────────
// Indexer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCall {
    Update(Identity, Fields),
    Delete(BTreeSet<Identity>),
    Commit,
    Close(bool),
}

#[derive(Default)]
pub struct MemoryIndexer {
    calls: Mutex<Vec<IndexCall>>,
    docs: Mutex<BTreeMap<Identity, Fields>>,
}

impl MemoryIndexer {
    pub fn calls(&self) -> Vec<IndexCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(Identity, Fields)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                IndexCall::Update(id, f) => Some((id, f)),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<BTreeSet<Identity>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                IndexCall::Delete(ids) => Some(ids),
                _ => None,
            })
            .collect()
    }

    pub fn commits(&self) -> usize {
        self.calls().iter().filter(|c| **c == IndexCall::Commit).count()
    }

    pub fn docs(&self) -> BTreeMap<Identity, Fields> {
        self.docs.lock().unwrap().clone()
    }
}

impl Indexer for MemoryIndexer {
    fn update(&self, identity: &Identity, fields: &Fields) -> Result<(), IndexerError> {
        self.calls.lock().unwrap().push(IndexCall::Update(*identity, fields.clone()));
        self.docs.lock().unwrap().insert(*identity, fields.clone());
        Ok(())
    }

    fn delete(&self, identities: &BTreeSet<Identity>) -> Result<(), IndexerError> {
        self.calls.lock().unwrap().push(IndexCall::Delete(identities.clone()));
        let mut docs = self.docs.lock().unwrap();
        for identity in identities {
            match identity {
                Identity::Parent { content_id } => {
                    docs.retain(|k, _| k.content_id() != *content_id)
                }
                Identity::ChildRow { .. } => {
                    docs.remove(identity);
                }
            }
        }
        Ok(())
    }

    fn commit(&self) -> Result<(), IndexerError> {
        self.calls.lock().unwrap().push(IndexCall::Commit);
        Ok(())
    }

    fn close(&self, optimize: bool) -> Result<(), IndexerError> {
        self.calls.lock().unwrap().push(IndexCall::Close(optimize));
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Content repository
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StoredItem {
    pub revision: RevisionId,
    pub content_type_id: ContentTypeId,
    pub fields: Fields,
    pub children: BTreeMap<RowKey, Fields>,
}

#[derive(Default)]
pub struct MemoryContent {
    items: Mutex<HashMap<ContentId, StoredItem>>,
    types: Mutex<HashMap<ContentTypeId, ContentTypeInfo>>,
    failing: Mutex<HashSet<ContentId>>,
    panicking: Mutex<HashSet<ContentId>>,
    delays: Mutex<HashMap<ContentId, Duration>>,
    loads: Mutex<Vec<(ContentId, LoadScope)>>,
}

impl MemoryContent {
    /// Repository with searchable `ARTICLE` (child 2 searchable) and `GALLERY` types.
    pub fn new() -> Arc<Self> {
        let content = Self::default();
        content.add_type(ARTICLE, "article", true);
        content.add_type(GALLERY, "gallery", true);
        Arc::new(content)
    }

    pub fn add_type(&self, id: i64, name: &str, searchable: bool) {
        self.types.lock().unwrap().insert(
            ContentTypeId(id),
            ContentTypeInfo {
                id: ContentTypeId(id),
                name: name.to_string(),
                running: true,
                visible: true,
                searchable,
                searchable_children: BTreeSet::from([ChildId(2)]),
            },
        );
    }

    pub fn remove_type(&self, id: i64) {
        self.types.lock().unwrap().remove(&ContentTypeId(id));
    }

    pub fn add_item(&self, id: i64, revision: i64, content_type: i64, item_fields: Fields) {
        self.items.lock().unwrap().insert(
            ContentId(id),
            StoredItem {
                revision: RevisionId(revision),
                content_type_id: ContentTypeId(content_type),
                fields: item_fields,
                children: BTreeMap::new(),
            },
        );
    }

    pub fn add_row(&self, id: i64, row: RowKey, row_fields: Fields) {
        if let Some(item) = self.items.lock().unwrap().get_mut(&ContentId(id)) {
            item.children.insert(row, row_fields);
        }
    }

    pub fn remove_item(&self, id: i64) {
        self.items.lock().unwrap().remove(&ContentId(id));
    }

    pub fn fail_on(&self, id: i64) {
        self.failing.lock().unwrap().insert(ContentId(id));
    }

    pub fn panic_on(&self, id: i64) {
        self.panicking.lock().unwrap().insert(ContentId(id));
    }

    /// Make `load_item` for `id` sleep after recording the load.
    pub fn delay_on(&self, id: i64, delay: Duration) {
        self.delays.lock().unwrap().insert(ContentId(id), delay);
    }

    pub fn loads(&self) -> Vec<(ContentId, LoadScope)> {
        self.loads.lock().unwrap().clone()
    }
}

impl ContentLoader for MemoryContent {
    fn current_revision(
        &self,
        content_id: ContentId,
    ) -> Result<Option<RevisionId>, LoaderError> {
        Ok(self.items.lock().unwrap().get(&content_id).map(|i| i.revision))
    }

    fn load_summary(
        &self,
        locator: &ItemLocator,
    ) -> Result<Option<ItemSummary>, LoaderError> {
        Ok(self.items.lock().unwrap().get(&locator.content_id).map(|i| ItemSummary {
            content_id: locator.content_id,
            revision: i.revision,
            content_type_id: i.content_type_id,
        }))
    }

    fn load_system_fields(&self, content_id: ContentId) -> Result<Fields, LoaderError> {
        Ok(fields(&[("sys_contentid", content_id.to_string().as_str())]))
    }

    fn load_item(
        &self,
        locator: &ItemLocator,
        scope: &LoadScope,
    ) -> Result<Option<LoadedItem>, LoaderError> {
        let cid = locator.content_id;
        if self.panicking.lock().unwrap().contains(&cid) {
            panic!("loader exploded for {cid}");
        }
        if self.failing.lock().unwrap().contains(&cid) {
            return Err(LoaderError::Load { content_id: cid, reason: "corrupt".into() });
        }
        self.loads.lock().unwrap().push((cid, scope.clone()));
        let delay = self.delays.lock().unwrap().get(&cid).copied();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        let items = self.items.lock().unwrap();
        let Some(item) = items.get(&cid) else {
            return Ok(None);
        };
        Ok(Some(LoadedItem {
            fields: scope.includes_parent().then(|| item.fields.clone()),
            children: item
                .children
                .iter()
                .filter(|(row, _)| scope.includes_row(row))
                .map(|(row, f)| ChildRowFields { row: *row, fields: f.clone() })
                .collect(),
        }))
    }

    fn list_items(
        &self,
        content_type_id: ContentTypeId,
    ) -> Result<Vec<ItemLocator>, LoaderError> {
        let items = self.items.lock().unwrap();
        let mut locators: Vec<ItemLocator> = items
            .iter()
            .filter(|(_, i)| i.content_type_id == content_type_id)
            .map(|(id, i)| ItemLocator::with_revision(*id, i.revision))
            .collect();
        locators.sort_by_key(|l| l.content_id);
        Ok(locators)
    }
}

impl ContentTypeCatalog for MemoryContent {
    fn lookup(&self, content_type_id: ContentTypeId) -> Option<ContentTypeInfo> {
        self.types.lock().unwrap().get(&content_type_id).cloned()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Queue store
// ─────────────────────────────────────────────────────────────────────────────

/// Store whose writes always fail; reads see an empty queue.
pub struct FailingStore;

impl QueueStore for FailingStore {
    fn save(&self, _event: &QueueEvent) -> Result<QueueId, StoreError> {
        Err(StoreError::Unavailable("disk offline".into()))
    }

    fn load_batch(&self, _max_count: usize) -> Result<Vec<QueueItem>, StoreError> {
        Ok(Vec::new())
    }

    fn delete_by_ids(&self, _ids: &[QueueId]) -> Result<usize, StoreError> {
        Ok(0)
    }

    fn delete_by_content_id(&self, _content_id: ContentId) -> Result<usize, StoreError> {
        Ok(0)
    }

    fn delete_by_content_type_id(
        &self,
        _content_type_id: ContentTypeId,
    ) -> Result<usize, StoreError> {
        Ok(0)
    }

    fn delete_all(&self) -> Result<usize, StoreError> {
        Ok(0)
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(0)
    }

    fn wait_for_next(&self, timeout: Duration) -> bool {
        thread::sleep(timeout);
        false
    }

    fn shutdown(&self) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<QueueNotification>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<QueueNotification> {
        self.events.lock().unwrap().clone()
    }

    pub fn queued(&self) -> usize {
        self.events()
            .iter()
            .map(|e| match e {
                QueueNotification::ItemQueued { count } => *count,
                _ => 0,
            })
            .sum()
    }

    pub fn processed(&self) -> usize {
        self.events()
            .iter()
            .map(|e| match e {
                QueueNotification::ItemProcessed { count } => *count,
                _ => 0,
            })
            .sum()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: &QueueNotification) {
        self.events.lock().unwrap().push(*notification);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

pub struct Harness {
    pub queue: IndexEventQueue,
    pub store: Arc<SqliteQueueStore>,
    pub indexer: Arc<MemoryIndexer>,
    pub content: Arc<MemoryContent>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(SqliteQueueStore::open_in_memory().unwrap()))
    }

    pub fn with_store(store: Arc<SqliteQueueStore>) -> Self {
        let indexer = Arc::new(MemoryIndexer::default());
        let content = MemoryContent::new();
        let sink = Arc::new(RecordingSink::default());
        let queue = IndexEventQueue::builder(
            store.clone(),
            indexer.clone(),
            content.clone(),
            content.clone(),
        )
        .config(fast_config())
        .sink(sink.clone())
        .build();
        Self { queue, store, indexer, content, sink }
    }

    /// Start the worker and wait until the store is drained.
    pub fn drain(&self) {
        if self.queue.status() == indexq_core::QueueStatus::Stopped {
            self.queue.start().unwrap();
        }
        assert!(
            wait_until(Duration::from_secs(10), || self.store.count().unwrap() == 0),
            "queue did not drain"
        );
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.queue.shutdown();
    }
}
