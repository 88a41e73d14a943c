//! Storage error types for aggtree-storage.
//!
//! [`StorageError`] covers all anticipated failure modes in the storage layer:
//! serialization, SQLite and migration failures, missing documents, and
//! documents stored under a different kind than the one requested.

use aggtree_core::DocId;
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An underlying SQLite call failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// No document exists with the given id.
    #[error("document not found: {id}")]
    DocumentNotFound { id: DocId },

    /// The document exists but was stored as a different kind.
    #[error("document {id} is a '{found}', expected '{expected}'")]
    KindMismatch {
        id: DocId,
        expected: String,
        found: String,
    },

    /// A data integrity violation was detected.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },
}
