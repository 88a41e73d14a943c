//! Error type for the aggregation tree facade.
//!
//! [`TreeError`] is the one error callers of [`AggregationTree`](crate::AggregationTree)
//! see. Graph and codec failures arrive as [`TreeError::Core`]; a document
//! missing from the store (or stored under another kind) is reported as
//! [`TreeError::NotFound`]; every other store failure passes through
//! unchanged as [`TreeError::Storage`].

use aggtree_core::{CoreError, DocId};
use aggtree_storage::StorageError;

/// Errors produced by [`AggregationTree`](crate::AggregationTree) operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Invalid argument, unknown anchor, duplicate id, or structural failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No aggregation tree is stored under the id.
    #[error("aggregation tree {id} does not exist")]
    NotFound { id: DocId },

    /// The store failed (I/O, serialization, ...).
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for TreeError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DocumentNotFound { id } | StorageError::KindMismatch { id, .. } => {
                TreeError::NotFound { id }
            }
            other => TreeError::Storage(other),
        }
    }
}

impl TreeError {
    /// True for a missing stored tree or a missing path anchor.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TreeError::NotFound { .. } | TreeError::Core(CoreError::NodeNotFound { .. })
        )
    }

    pub fn is_duplicate_id(&self) -> bool {
        matches!(self, TreeError::Core(CoreError::DuplicateId { .. }))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, TreeError::Core(CoreError::InvalidArgument { .. }))
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, TreeError::Core(CoreError::Structural { .. }))
    }
}
