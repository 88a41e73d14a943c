//! Aggregation tree facade.
//!
//! [`AggregationTree`] ties the core graph and codec to a
//! [`DocumentStore`](aggtree_storage::DocumentStore): create or load a tree,
//! extend it with paths, and save it back.

pub mod error;
pub mod tree;

pub use error::TreeError;
pub use tree::AggregationTree;
