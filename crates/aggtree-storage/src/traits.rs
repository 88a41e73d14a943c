//! The [`DocumentStore`] trait defining the storage contract for documents.
//!
//! Two-layer API design:
//! - **Raw** methods on the trait move untyped JSON bodies tagged with a
//!   document kind. Backends implement only these.
//! - **Typed** helpers ([`load_document`], [`save_document`]) serialize any
//!   [`Document`] on top of the raw methods.
//!
//! Bodies are stored without their id; the typed helpers strip it on save and
//! inject it again on load.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use aggtree_core::{DocId, TreeDocument};

use crate::error::StorageError;
use crate::types::DocumentSummary;

/// A serde type that can be persisted in a [`DocumentStore`].
pub trait Document: Serialize + DeserializeOwned {
    /// Kind tag stored alongside the body.
    const KIND: &'static str;

    fn doc_id(&self) -> Option<&DocId>;
}

impl Document for TreeDocument {
    const KIND: &'static str = "AggregationTree";

    fn doc_id(&self) -> Option<&DocId> {
        self.id.as_ref()
    }
}

/// The storage contract for JSON documents.
///
/// Methods take `&self`; backends synchronize internally so one store can be
/// shared across threads.
pub trait DocumentStore: Send + Sync {
    /// Loads the body stored under `id`.
    ///
    /// Fails with [`StorageError::DocumentNotFound`] if there is no such
    /// document and [`StorageError::KindMismatch`] if it has another kind.
    fn load_raw(&self, id: &DocId, kind: &str) -> Result<Value, StorageError>;

    /// Inserts or replaces a body and returns its id.
    ///
    /// With `id == None` a fresh id is allocated. With an id, the document is
    /// overwritten (its revision bumped) or created under that id.
    fn save_raw(&self, id: Option<&DocId>, kind: &str, body: Value)
        -> Result<DocId, StorageError>;

    /// Deletes a document.
    fn delete(&self, id: &DocId) -> Result<(), StorageError>;

    /// Lists all documents of a kind, ordered by id.
    fn list(&self, kind: &str) -> Result<Vec<DocumentSummary>, StorageError>;
}

/// Loads and deserializes a typed document.
pub fn load_document<D, S>(store: &S, id: &DocId) -> Result<D, StorageError>
where
    D: Document,
    S: DocumentStore + ?Sized,
{
    let mut body = store.load_raw(id, D::KIND)?;
    match body.as_object_mut() {
        Some(obj) => {
            obj.insert("id".to_string(), Value::String(id.as_str().to_string()));
        }
        None => {
            return Err(StorageError::IntegrityError {
                reason: format!("document {id} body is not a JSON object"),
            })
        }
    }
    Ok(serde_json::from_value(body)?)
}

/// Serializes and stores a typed document, returning its (possibly new) id.
pub fn save_document<D, S>(store: &S, doc: &D) -> Result<DocId, StorageError>
where
    D: Document,
    S: DocumentStore + ?Sized,
{
    let mut body = serde_json::to_value(doc)?;
    if let Some(obj) = body.as_object_mut() {
        obj.remove("id");
    }
    store.save_raw(doc.doc_id(), D::KIND, body)
}

/// Rejects bodies that are not JSON objects.
pub(crate) fn ensure_object(body: &Value) -> Result<(), StorageError> {
    if body.is_object() {
        Ok(())
    } else {
        Err(StorageError::IntegrityError {
            reason: "document body must be a JSON object".to_string(),
        })
    }
}
