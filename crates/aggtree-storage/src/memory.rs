//! In-memory implementation of [`DocumentStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests and anywhere
//! persistence isn't needed. Documents live in a `DashMap`, so the store can
//! be shared across threads and behaves like the SQLite backend.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use aggtree_core::DocId;

use crate::error::StorageError;
use crate::traits::{ensure_object, DocumentStore};
use crate::types::{body_name, new_doc_id, DocumentSummary};

/// Data stored for a single document.
#[derive(Debug, Clone)]
struct StoredDocument {
    kind: String,
    revision: u64,
    body: Value,
}

/// In-memory implementation of [`DocumentStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: DashMap<DocId, StoredDocument>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        InMemoryStore {
            documents: DashMap::new(),
        }
    }

    /// Number of stored documents of any kind.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Current revision of a document, if it exists.
    pub fn revision(&self, id: &DocId) -> Option<u64> {
        self.documents.get(id).map(|d| d.revision)
    }
}

impl DocumentStore for InMemoryStore {
    fn load_raw(&self, id: &DocId, kind: &str) -> Result<Value, StorageError> {
        let stored = self
            .documents
            .get(id)
            .ok_or_else(|| StorageError::DocumentNotFound { id: id.clone() })?;
        if stored.kind != kind {
            return Err(StorageError::KindMismatch {
                id: id.clone(),
                expected: kind.to_string(),
                found: stored.kind.clone(),
            });
        }
        Ok(stored.body.clone())
    }

    fn save_raw(
        &self,
        id: Option<&DocId>,
        kind: &str,
        body: Value,
    ) -> Result<DocId, StorageError> {
        ensure_object(&body)?;
        let id = id.cloned().unwrap_or_else(new_doc_id);

        // The entry guard holds the shard lock for the whole check-and-write.
        match self.documents.entry(id.clone()) {
            Entry::Occupied(mut occupied) => {
                let stored = occupied.get_mut();
                if stored.kind != kind {
                    return Err(StorageError::KindMismatch {
                        id,
                        expected: kind.to_string(),
                        found: stored.kind.clone(),
                    });
                }
                stored.revision += 1;
                stored.body = body;
                tracing::debug!(%id, revision = stored.revision, "updated document");
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredDocument {
                    kind: kind.to_string(),
                    revision: 1,
                    body,
                });
                tracing::debug!(%id, kind, "inserted document");
            }
        }
        Ok(id)
    }

    fn delete(&self, id: &DocId) -> Result<(), StorageError> {
        self.documents
            .remove(id)
            .ok_or_else(|| StorageError::DocumentNotFound { id: id.clone() })?;
        Ok(())
    }

    fn list(&self, kind: &str) -> Result<Vec<DocumentSummary>, StorageError> {
        let mut summaries: Vec<DocumentSummary> = self
            .documents
            .iter()
            .filter(|entry| entry.value().kind == kind)
            .map(|entry| DocumentSummary {
                id: entry.key().clone(),
                kind: entry.value().kind.clone(),
                revision: entry.value().revision,
                name: body_name(&entry.value().body),
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }
}
