//! Document storage for aggregation trees.
//!
//! Provides the [`DocumentStore`] trait defining the storage contract, plus
//! the [`InMemoryStore`] and [`SqliteStore`] backends.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: DocumentSummary listing type
//! - [`traits`]: DocumentStore trait and typed load/save helpers
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: SQL schema and migration setup
//! - [`sqlite`]: SqliteStore implementation

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{load_document, save_document, Document, DocumentStore};
pub use types::DocumentSummary;
