//! Core data model for aggregation trees.
//!
//! An aggregation tree is a hierarchical classification (country -> state ->
//! city, ...) persisted as a nested map and edited in memory as a graph.
//!
//! # Modules
//!
//! - [`id`]: NodeId / DocId newtypes and the sentinel [`ROOT_ID`]
//! - [`attr`]: scalar attribute values
//! - [`document`]: persisted nested-map form
//! - [`graph`]: in-memory [`TreeGraph`]
//! - [`path`]: [`PathEntry`] for path insertion
//! - [`codec`]: document <-> graph conversions
//! - [`error`]: [`CoreError`]

pub mod attr;
pub mod codec;
pub mod document;
pub mod error;
pub mod graph;
pub mod id;
pub mod path;

// Re-export commonly used types
pub use attr::{AttrValue, Attributes};
pub use codec::{decode, decode_document, encode};
pub use document::{NodeMap, NodePayload, TreeDocument, CHILDREN_KEY};
pub use error::CoreError;
pub use graph::{TreeGraph, MAX_DEPTH};
pub use id::{DocId, NodeId, ROOT_ID};
pub use path::PathEntry;
