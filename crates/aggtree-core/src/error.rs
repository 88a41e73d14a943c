//! Core error types for aggtree-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! every failure mode of the tree graph and its codec.

use thiserror::Error;

use crate::id::NodeId;

/// Core errors produced by the aggtree-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A caller-supplied argument was rejected (empty name, empty path, ...).
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A node id was not found in the tree.
    #[error("node not found: '{id}'")]
    NodeNotFound { id: NodeId },

    /// A node id already exists somewhere in the tree.
    #[error("duplicate node id: '{id}'")]
    DuplicateId { id: NodeId },

    /// The graph no longer forms a rooted tree.
    #[error("structural error: {reason}")]
    Structural { reason: String },
}

impl CoreError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        CoreError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn structural(reason: impl Into<String>) -> Self {
        CoreError::Structural {
            reason: reason.into(),
        }
    }
}
