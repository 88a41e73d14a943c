//! SQLite implementation of [`DocumentStore`].
//!
//! [`SqliteStore`] keeps every document as a JSON TEXT body in one
//! `documents` table keyed by id, with a kind column and a revision counter.
//! Writes run inside a transaction. The connection sits behind a `Mutex`
//! because `rusqlite::Connection` is `!Sync`.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use aggtree_core::DocId;

use crate::error::StorageError;
use crate::traits::{ensure_object, DocumentStore};
use crate::types::{body_name, new_doc_id, DocumentSummary};

/// SQLite-backed implementation of [`DocumentStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::IntegrityError {
            reason: "sqlite connection lock poisoned".to_string(),
        })
    }

    /// Current revision of a document, if it exists.
    pub fn revision(&self, id: &DocId) -> Result<Option<u64>, StorageError> {
        let conn = self.conn()?;
        let rev: Option<i64> = conn
            .query_row(
                "SELECT revision FROM documents WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rev.map(|r| r as u64))
    }
}

impl DocumentStore for SqliteStore {
    fn load_raw(&self, id: &DocId, kind: &str) -> Result<Value, StorageError> {
        let conn = self.conn()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT kind, body FROM documents WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (found, body) = row.ok_or_else(|| StorageError::DocumentNotFound { id: id.clone() })?;
        if found != kind {
            return Err(StorageError::KindMismatch {
                id: id.clone(),
                expected: kind.to_string(),
                found,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn save_raw(
        &self,
        id: Option<&DocId>,
        kind: &str,
        body: Value,
    ) -> Result<DocId, StorageError> {
        ensure_object(&body)?;
        let id = id.cloned().unwrap_or_else(new_doc_id);
        let body_json = serde_json::to_string(&body)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT kind FROM documents WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(found) if found != kind => {
                return Err(StorageError::KindMismatch {
                    id,
                    expected: kind.to_string(),
                    found,
                });
            }
            Some(_) => {
                tx.execute(
                    "UPDATE documents SET body = ?2, revision = revision + 1, updated_at = datetime('now') WHERE id = ?1",
                    params![id.as_str(), body_json],
                )?;
                tracing::debug!(%id, "updated document");
            }
            None => {
                tx.execute(
                    "INSERT INTO documents (id, kind, body) VALUES (?1, ?2, ?3)",
                    params![id.as_str(), kind, body_json],
                )?;
                tracing::debug!(%id, kind, "inserted document");
            }
        }
        tx.commit()?;
        Ok(id)
    }

    fn delete(&self, id: &DocId) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM documents WHERE id = ?1", params![id.as_str()])?;
        if removed == 0 {
            return Err(StorageError::DocumentNotFound { id: id.clone() });
        }
        Ok(())
    }

    fn list(&self, kind: &str) -> Result<Vec<DocumentSummary>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, revision, body FROM documents WHERE kind = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![kind], |row| {
            let id: String = row.get(0)?;
            let revision: i64 = row.get(1)?;
            let body: String = row.get(2)?;
            Ok((id, revision, body))
        })?;
        let mut result = Vec::new();
        for row in rows {
            let (id, revision, body) = row?;
            let body: Value = serde_json::from_str(&body)?;
            result.push(DocumentSummary {
                id: DocId::new(id),
                kind: kind.to_string(),
                revision: revision as u64,
                name: body_name(&body),
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{load_document, save_document};
    use aggtree_core::{decode_document, encode, PathEntry, TreeDocument, TreeGraph, ROOT_ID};
    use serde_json::json;

    fn geo_document() -> (TreeDocument, TreeGraph) {
        let mut graph = TreeGraph::new();
        graph
            .extend_path(vec![
                ROOT_ID.into(),
                PathEntry::new("India").attr("iso", "IND"),
                "Kerala".into(),
            ])
            .unwrap();
        graph
            .extend_path(vec!["India".into(), PathEntry::new("Karnataka").attr("pop", 61_000_000)])
            .unwrap();
        let mut doc = TreeDocument::new("geo");
        doc.root = encode(&graph).unwrap();
        (doc, graph)
    }

    #[test]
    fn save_and_load_raw() {
        let store = SqliteStore::in_memory().unwrap();
        let id = store
            .save_raw(None, "AggregationTree", json!({"name": "geo", "root": {}}))
            .unwrap();
        let body = store.load_raw(&id, "AggregationTree").unwrap();
        assert_eq!(body, json!({"name": "geo", "root": {}}));
        assert_eq!(store.revision(&id).unwrap(), Some(1));
    }

    #[test]
    fn update_bumps_revision() {
        let store = SqliteStore::in_memory().unwrap();
        let id = store.save_raw(None, "K", json!({"v": 1})).unwrap();
        store.save_raw(Some(&id), "K", json!({"v": 2})).unwrap();
        store.save_raw(Some(&id), "K", json!({"v": 3})).unwrap();
        assert_eq!(store.revision(&id).unwrap(), Some(3));
        assert_eq!(store.load_raw(&id, "K").unwrap()["v"], 3);
    }

    #[test]
    fn save_with_caller_chosen_id_creates() {
        let store = SqliteStore::in_memory().unwrap();
        let id = DocId::from("geo-tree");
        let back = store.save_raw(Some(&id), "K", json!({})).unwrap();
        assert_eq!(back, id);
        assert_eq!(store.revision(&id).unwrap(), Some(1));
    }

    #[test]
    fn missing_and_wrong_kind() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store.load_raw(&DocId::from("x"), "K").unwrap_err();
        assert!(matches!(err, StorageError::DocumentNotFound { .. }));

        let id = store.save_raw(None, "Entity", json!({})).unwrap();
        let err = store.load_raw(&id, "K").unwrap_err();
        assert!(matches!(err, StorageError::KindMismatch { .. }));
        let err = store.save_raw(Some(&id), "K", json!({})).unwrap_err();
        assert!(matches!(err, StorageError::KindMismatch { .. }));
        // The failed write rolled back.
        assert_eq!(store.revision(&id).unwrap(), Some(1));
    }

    #[test]
    fn list_and_delete() {
        let store = SqliteStore::in_memory().unwrap();
        let a = store.save_raw(None, "K", json!({"name": "a"})).unwrap();
        store.save_raw(None, "K", json!({"name": 7})).unwrap();
        store.save_raw(None, "Other", json!({"name": "c"})).unwrap();

        let listed = store.list("K").unwrap();
        assert_eq!(listed.len(), 2);
        let names: Vec<Option<String>> = listed.iter().map(|s| s.name.clone()).collect();
        assert!(names.contains(&Some("a".to_string())));
        assert!(names.contains(&None));

        store.delete(&a).unwrap();
        assert_eq!(store.list("K").unwrap().len(), 1);
        assert!(matches!(
            store.delete(&a).unwrap_err(),
            StorageError::DocumentNotFound { .. }
        ));
    }

    #[test]
    fn typed_tree_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        let (doc, graph) = geo_document();
        let id = save_document(&store, &doc).unwrap();

        let loaded: TreeDocument = load_document(&store, &id).unwrap();
        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.root, doc.root);
        assert_eq!(decode_document(&loaded).unwrap(), graph);
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trees.db");
        let path = path.to_str().unwrap();
        let (doc, _) = geo_document();

        let id = {
            let store = SqliteStore::new(path).unwrap();
            save_document(&store, &doc).unwrap()
        };

        let store = SqliteStore::new(path).unwrap();
        let loaded: TreeDocument = load_document(&store, &id).unwrap();
        assert_eq!(loaded.name, "geo");
        assert_eq!(loaded.node_count(), 3);
    }
}
