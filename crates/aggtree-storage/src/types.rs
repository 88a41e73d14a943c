//! Storage-layer types for document metadata.

use serde::{Deserialize, Serialize};

use aggtree_core::DocId;

/// Summary of a stored document (for listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document identifier.
    pub id: DocId,
    /// Document kind, e.g. `"AggregationTree"`.
    pub kind: String,
    /// Number of times the document has been written.
    pub revision: u64,
    /// The body's `name` field, when it has a string one.
    pub name: Option<String>,
}

/// Allocates a fresh opaque document id.
pub(crate) fn new_doc_id() -> DocId {
    DocId::new(uuid::Uuid::new_v4().simple().to_string())
}

/// Reads the optional `name` field out of a JSON body.
pub(crate) fn body_name(body: &serde_json::Value) -> Option<String> {
    body.get("name")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
