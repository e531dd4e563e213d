//! SQLite-backed queue store.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, params, params_from_iter};

use super::lock;
use super::schema::init_schema;
use super::store::{QueueStore, StoreError};
use super::types::{
    ActionType, ContentId, ContentTypeId, QueueEvent, QueueId, QueueItem, RevisionId,
    RowKey,
};

const SELECT_ITEMS: &str = "SELECT queue_id, content_id, revision_id, content_type_id, child_id,
        child_row_id, action, binary_fields, priority, requires_commit, queued_at
     FROM queue_items";

/// Durable queue store handle.
///
/// The connection is serialized behind a mutex; waiters block on a condition
/// variable that is signalled by every insert and by [`QueueStore::shutdown`].
pub struct SqliteQueueStore {
    conn: Mutex<Connection>,
    signal: Mutex<u64>,
    wake: Condvar,
}

impl SqliteQueueStore {
    /// Open or create a queue database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        init_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn), signal: Mutex::new(0), wake: Condvar::new() }
    }

    /// Oldest pending items without consuming them.
    pub fn peek(&self, limit: usize) -> Result<Vec<QueueItem>, StoreError> {
        self.load_batch(limit)
    }

    /// Pending row counts grouped by content type, largest first.
    pub fn pending_by_content_type(&self) -> Result<Vec<(ContentTypeId, u64)>, StoreError> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(
            "SELECT content_type_id, COUNT(*) FROM queue_items
             GROUP BY content_type_id ORDER BY COUNT(*) DESC, content_type_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((ContentTypeId(row.get(0)?), row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn signal_waiters(&self) {
        let mut seq = lock(&self.signal);
        *seq = seq.wrapping_add(1);
        self.wake.notify_all();
    }

    fn row_to_item(row: &rusqlite::Row) -> Result<QueueItem, rusqlite::Error> {
        let action_str: String = row.get(6)?;
        let action = ActionType::from_str(&action_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                Type::Text,
                format!("unknown action '{action_str}'").into(),
            )
        })?;

        let fields_json: String = row.get(7)?;
        let binary_fields: BTreeSet<String> = serde_json::from_str(&fields_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, e.into()))?;

        let queued_str: String = row.get(10)?;
        let queued_at = DateTime::parse_from_rfc3339(&queued_str)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let child_id: i64 = row.get(4)?;
        let child_row_id: i64 = row.get(5)?;

        Ok(QueueItem {
            queue_id: QueueId(row.get(0)?),
            event: QueueEvent {
                content_id: ContentId(row.get(1)?),
                revision_id: row.get::<_, Option<i64>>(2)?.map(RevisionId),
                content_type_id: ContentTypeId(row.get(3)?),
                row: (child_id > 0 && child_row_id > 0)
                    .then(|| RowKey::new(child_id, child_row_id)),
                action,
                binary_fields,
                priority: row.get(8)?,
                requires_commit: row.get(9)?,
            },
            queued_at,
        })
    }
}

impl QueueStore for SqliteQueueStore {
    fn save(&self, event: &QueueEvent) -> Result<QueueId, StoreError> {
        let binary_fields = serde_json::to_string(&event.binary_fields)?;
        let (child_id, child_row_id) =
            event.row.map_or((0, 0), |r| (r.child_id.get(), r.row_id.get()));

        let id = {
            let conn = lock(&self.conn);
            conn.execute(
                "INSERT INTO queue_items (content_id, revision_id, content_type_id, child_id,
                    child_row_id, action, binary_fields, priority, requires_commit, queued_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    event.content_id.get(),
                    event.revision_id.map(RevisionId::get),
                    event.content_type_id.get(),
                    child_id,
                    child_row_id,
                    event.action.as_str(),
                    binary_fields,
                    event.priority,
                    event.requires_commit,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            conn.last_insert_rowid()
        };

        self.signal_waiters();
        Ok(QueueId(id))
    }

    fn load_batch(&self, max_count: usize) -> Result<Vec<QueueItem>, StoreError> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(&format!("{SELECT_ITEMS} ORDER BY queue_id ASC LIMIT ?1"))?;
        let items = stmt
            .query_map([max_count as i64], Self::row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn delete_by_ids(&self, ids: &[QueueId]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = lock(&self.conn);
        let tx = conn.transaction()?;
        let mut removed = 0;
        // Chunked to stay under SQLite's bound-parameter limit
        for chunk in ids.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            removed += tx.execute(
                &format!("DELETE FROM queue_items WHERE queue_id IN ({placeholders})"),
                params_from_iter(chunk.iter().map(|id| id.get())),
            )?;
        }
        tx.commit()?;
        Ok(removed)
    }

    fn delete_by_content_id(&self, content_id: ContentId) -> Result<usize, StoreError> {
        let conn = lock(&self.conn);
        let removed =
            conn.execute("DELETE FROM queue_items WHERE content_id = ?1", [content_id.get()])?;
        Ok(removed)
    }

    fn delete_by_content_type_id(
        &self,
        content_type_id: ContentTypeId,
    ) -> Result<usize, StoreError> {
        let conn = lock(&self.conn);
        let removed = conn.execute(
            "DELETE FROM queue_items WHERE content_type_id = ?1",
            [content_type_id.get()],
        )?;
        Ok(removed)
    }

    fn delete_all(&self) -> Result<usize, StoreError> {
        let conn = lock(&self.conn);
        let removed = conn.execute("DELETE FROM queue_items", [])?;
        Ok(removed)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = lock(&self.conn);
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM queue_items", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn wait_for_next(&self, timeout: Duration) -> bool {
        // Snapshot the sequence first so an insert racing the count is not missed
        let start = *lock(&self.signal);

        match self.count() {
            Ok(n) if n > 0 => return true,
            Ok(_) => {}
            Err(e) => tracing::warn!("Queue count failed while waiting: {}", e),
        }

        let guard = lock(&self.signal);
        let (_guard, result) = self
            .wake
            .wait_timeout_while(guard, timeout, |seq| *seq == start)
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        !result.timed_out()
    }

    fn shutdown(&self) {
        self.signal_waiters();
    }
}
