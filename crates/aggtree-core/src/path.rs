//! Path entries for [`TreeGraph::extend_path`](crate::graph::TreeGraph::extend_path).
//!
//! An entry is a node id with optional attributes. Bare ids convert via
//! `From<&str>`; attributes are attached with the [`PathEntry::attr`] builder:
//!
//! ```
//! use aggtree_core::{PathEntry, ROOT_ID};
//!
//! let path: Vec<PathEntry> = vec![
//!     ROOT_ID.into(),
//!     "US".into(),
//!     PathEntry::new("CA").attr("pop", 39_000_000),
//!     "SF".into(),
//! ];
//! assert_eq!(path.len(), 4);
//! ```

use crate::attr::{AttrValue, Attributes};
use crate::id::NodeId;

/// One element of a path: a node id and, optionally, its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PathEntry {
    pub id: NodeId,
    pub attributes: Option<Attributes>,
}

impl PathEntry {
    pub fn new(id: impl Into<NodeId>) -> Self {
        PathEntry {
            id: id.into(),
            attributes: None,
        }
    }

    pub fn with_attributes(id: impl Into<NodeId>, attributes: Attributes) -> Self {
        PathEntry {
            id: id.into(),
            attributes: Some(attributes),
        }
    }

    /// Adds one attribute, creating the map on first use.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes
            .get_or_insert_with(Attributes::new)
            .insert(key.into(), value.into());
        self
    }
}

impl From<&str> for PathEntry {
    fn from(id: &str) -> Self {
        PathEntry::new(id)
    }
}

impl From<String> for PathEntry {
    fn from(id: String) -> Self {
        PathEntry::new(id)
    }
}

impl From<NodeId> for PathEntry {
    fn from(id: NodeId) -> Self {
        PathEntry::new(id)
    }
}

impl<I: Into<NodeId>> From<(I, Attributes)> for PathEntry {
    fn from((id, attributes): (I, Attributes)) -> Self {
        PathEntry::with_attributes(id, attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_id_has_no_attributes() {
        let e = PathEntry::from("US");
        assert_eq!(e.id, NodeId::from("US"));
        assert!(e.attributes.is_none());
    }

    #[test]
    fn attr_builder_accumulates() {
        let e = PathEntry::new("CA").attr("pop", 39_000_000).attr("capital", "Sacramento");
        let attrs = e.attributes.unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["pop"], AttrValue::Int(39_000_000));
    }

    #[test]
    fn tuple_conversion() {
        let mut attrs = Attributes::new();
        attrs.insert("k".into(), AttrValue::Bool(true));
        let e: PathEntry = ("X", attrs.clone()).into();
        assert_eq!(e.attributes, Some(attrs));
    }
}
