//! SQLite FTS5 indexer.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, params};

use super::{Indexer, IndexerError};
use crate::content::Fields;
use crate::queue::{ContentId, Identity, lock};

/// One full-text match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub key: String,
    pub content_id: ContentId,
    pub rank: f64,
}

/// Search index stored in an FTS5 virtual table.
///
/// Writes open a transaction lazily; [`Indexer::commit`] ends it.
pub struct FtsIndexer {
    conn: Mutex<Connection>,
}

impl FtsIndexer {
    /// Open or create an index database at the given path.
    pub fn open(path: &Path) -> Result<Self, IndexerError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Self::init(conn)
    }

    /// Create an in-memory index (for testing).
    pub fn open_in_memory() -> Result<Self, IndexerError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, IndexerError> {
        conn.execute_batch(
            "CREATE VIRTUAL TABLE IF NOT EXISTS documents USING fts5(
                doc_key UNINDEXED,
                content_id UNINDEXED,
                fields_json UNINDEXED,
                body
            );",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Run a full-text query, best matches first.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, IndexerError> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(
            "SELECT doc_key, content_id, rank FROM documents
             WHERE documents MATCH ?1 ORDER BY rank LIMIT ?2",
        )?;
        let hits = stmt
            .query_map(params![query, limit as i64], |row| {
                Ok(SearchHit {
                    key: row.get(0)?,
                    content_id: ContentId(row.get(1)?),
                    rank: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }

    /// Stored fields for one index entry.
    pub fn document(&self, identity: &Identity) -> Result<Option<Fields>, IndexerError> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare("SELECT fields_json FROM documents WHERE doc_key = ?1")?;
        let mut rows = stmt.query([identity.key()])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    pub fn document_count(&self) -> Result<u64, IndexerError> {
        let conn = lock(&self.conn);
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn begin_if_needed(conn: &Connection) -> Result<(), IndexerError> {
        if conn.is_autocommit() {
            conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }
}

fn body_text(fields: &Fields) -> String {
    fields.values().map(String::as_str).collect::<Vec<_>>().join("\n")
}

impl Indexer for FtsIndexer {
    fn update(&self, identity: &Identity, fields: &Fields) -> Result<(), IndexerError> {
        let fields_json = serde_json::to_string(fields)?;
        let conn = lock(&self.conn);
        Self::begin_if_needed(&conn)?;
        let key = identity.key();
        conn.execute("DELETE FROM documents WHERE doc_key = ?1", [&key])?;
        conn.execute(
            "INSERT INTO documents (doc_key, content_id, fields_json, body)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, identity.content_id().get(), fields_json, body_text(fields)],
        )?;
        Ok(())
    }

    fn delete(&self, identities: &BTreeSet<Identity>) -> Result<(), IndexerError> {
        if identities.is_empty() {
            return Ok(());
        }
        let conn = lock(&self.conn);
        Self::begin_if_needed(&conn)?;
        for identity in identities {
            match identity {
                Identity::Parent { content_id } => {
                    conn.execute(
                        "DELETE FROM documents WHERE content_id = ?1",
                        [content_id.get()],
                    )?;
                }
                Identity::ChildRow { .. } => {
                    conn.execute(
                        "DELETE FROM documents WHERE doc_key = ?1",
                        [identity.key()],
                    )?;
                }
            }
        }
        Ok(())
    }

    fn commit(&self) -> Result<(), IndexerError> {
        let conn = lock(&self.conn);
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn close(&self, optimize: bool) -> Result<(), IndexerError> {
        self.commit()?;
        if optimize {
            let conn = lock(&self.conn);
            conn.execute("INSERT INTO documents(documents) VALUES('optimize')", [])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RowKey;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_update_replaces_existing_entry() {
        let idx = FtsIndexer::open_in_memory().unwrap();
        let id = Identity::parent(ContentId(10));
        idx.update(&id, &fields(&[("body", "first draft")])).unwrap();
        idx.update(&id, &fields(&[("body", "second version")])).unwrap();
        idx.commit().unwrap();

        assert_eq!(idx.document_count().unwrap(), 1);
        assert!(idx.search("draft", 10).unwrap().is_empty());
        let hits = idx.search("second", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content_id, ContentId(10));
    }

    #[test]
    fn test_parent_delete_removes_child_rows() {
        let idx = FtsIndexer::open_in_memory().unwrap();
        let cid = ContentId(10);
        idx.update(&Identity::parent(cid), &fields(&[("title", "parent")])).unwrap();
        idx.update(&Identity::child_row(cid, RowKey::new(2, 5)), &fields(&[("cell", "row")]))
            .unwrap();
        idx.update(&Identity::parent(ContentId(11)), &fields(&[("title", "other")])).unwrap();

        idx.delete(&BTreeSet::from([Identity::parent(cid)])).unwrap();
        idx.commit().unwrap();

        assert_eq!(idx.document_count().unwrap(), 1);
        assert!(idx.document(&Identity::parent(ContentId(11))).unwrap().is_some());
    }

    #[test]
    fn test_child_row_delete_keeps_parent() {
        let idx = FtsIndexer::open_in_memory().unwrap();
        let cid = ContentId(10);
        let row = Identity::child_row(cid, RowKey::new(2, 5));
        idx.update(&Identity::parent(cid), &fields(&[("title", "parent")])).unwrap();
        idx.update(&row, &fields(&[("cell", "row")])).unwrap();

        idx.delete(&BTreeSet::from([row])).unwrap();
        idx.close(true).unwrap();

        assert!(idx.document(&row).unwrap().is_none());
        assert_eq!(
            idx.document(&Identity::parent(cid)).unwrap(),
            Some(fields(&[("title", "parent")]))
        );
    }

    #[test]
    fn test_commit_without_writes_is_noop() {
        let idx = FtsIndexer::open_in_memory().unwrap();
        idx.commit().unwrap();
        idx.close(false).unwrap();
    }
}
