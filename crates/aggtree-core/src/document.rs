//! Persisted (nested-map) form of an aggregation tree.
//!
//! ```text
//! {
//!   "id": "...",
//!   "name": "geo",
//!   "root": {
//!     "US": { "iso": "USA", "children": { "CA": { "pop": 39000000 } } }
//!   }
//! }
//! ```
//!
//! The `root` map holds the sentinel root's children; the sentinel itself is
//! never written. Each payload is its node's attributes plus an optional
//! reserved [`CHILDREN_KEY`] entry holding the nested children.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::attr::Attributes;
use crate::id::{DocId, NodeId};

/// Reserved payload key under which a node's children are nested.
pub const CHILDREN_KEY: &str = "children";

/// Node id -> payload, in insertion order.
pub type NodeMap = IndexMap<NodeId, NodePayload>;

/// One node's persisted payload: attributes plus nested children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePayload {
    #[serde(flatten)]
    pub attributes: Attributes,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub children: NodeMap,
}

impl NodePayload {
    pub fn new(attributes: Attributes) -> Self {
        NodePayload {
            attributes,
            children: NodeMap::new(),
        }
    }
}

/// The persisted aggregation tree document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDocument {
    /// Assigned by the store on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocId>,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub root: NodeMap,
}

impl TreeDocument {
    /// A fresh, unsaved document with an empty root.
    pub fn new(name: impl Into<String>) -> Self {
        TreeDocument {
            id: None,
            name: name.into(),
            root: NodeMap::new(),
        }
    }

    /// Total number of nodes encoded in the document, excluding the sentinel.
    pub fn node_count(&self) -> usize {
        fn count(map: &NodeMap) -> usize {
            map.values().map(|p| 1 + count(&p.children)).sum()
        }
        count(&self.root)
    }
}

// `"children": null` is accepted and treated as a leaf.
fn null_as_empty<'de, D>(deserializer: D) -> Result<NodeMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<NodeMap>::deserialize(deserializer)?.unwrap_or_default())
}
