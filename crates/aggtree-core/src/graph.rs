//! TreeGraph: the in-memory form of an aggregation tree.
//!
//! [`TreeGraph`] is a purpose-built directed graph: a map from node id to
//! attributes, a map from node id to its ordered child ids, and a cached
//! child -> parent map. The sentinel root ([`ROOT_ID`]) is always present.
//!
//! # Invariants
//!
//! - Every node id occurs once in the whole graph, not just among siblings.
//! - The graph is a rooted tree: only the sentinel has no parent, every
//!   other node has exactly one, and there are no cycles. Nodes are inserted
//!   before the edge that links them and edges are never removed or moved,
//!   so the builder methods cannot break this.
//! - No attribute map contains the reserved [`CHILDREN_KEY`] or a
//!   non-finite float.
//! - No node sits deeper than [`MAX_DEPTH`] levels below the sentinel.
//!
//! All mutations go through `TreeGraph` methods. [`TreeGraph::from_parts`]
//! is the only way to construct a graph that bypasses these checks.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};

use crate::attr::{AttrValue, Attributes};
use crate::document::CHILDREN_KEY;
use crate::error::CoreError;
use crate::id::{NodeId, ROOT_ID};
use crate::path::PathEntry;

/// Deepest level a node may occupy; children of the sentinel are level 1.
///
/// Each level nests two JSON objects in the stored document, so this keeps
/// every tree within serde_json's default recursion limit of 128.
pub const MAX_DEPTH: usize = 48;

/// In-memory aggregation tree graph.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeGraph {
    /// Node id -> attributes, in insertion order.
    nodes: IndexMap<NodeId, Attributes>,
    /// Parent id -> ordered child ids.
    children: IndexMap<NodeId, IndexSet<NodeId>>,
    /// Child id -> parent id.
    parents: HashMap<NodeId, NodeId>,
}

impl Default for TreeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeGraph {
    /// Creates a graph holding only the sentinel root.
    pub fn new() -> Self {
        let mut nodes = IndexMap::new();
        nodes.insert(NodeId::root(), Attributes::new());
        TreeGraph {
            nodes,
            children: IndexMap::new(),
            parents: HashMap::new(),
        }
    }

    /// Builds a graph from raw node and adjacency maps without validation.
    ///
    /// The parent cache is derived from `children`. Nothing checks that the
    /// result is a tree; serialization reports any violation it walks into.
    pub fn from_parts(
        nodes: IndexMap<NodeId, Attributes>,
        children: IndexMap<NodeId, IndexSet<NodeId>>,
    ) -> Self {
        let mut parents = HashMap::new();
        for (parent, kids) in &children {
            for kid in kids {
                parents.insert(kid.clone(), parent.clone());
            }
        }
        TreeGraph {
            nodes,
            children,
            parents,
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn root_id(&self) -> NodeId {
        NodeId::root()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn attributes(&self, id: &str) -> Option<&Attributes> {
        self.nodes.get(id)
    }

    /// Child ids of `id` in insertion order; empty for leaves and unknown ids.
    pub fn children(&self, id: &str) -> impl Iterator<Item = &NodeId> {
        self.children.get(id).into_iter().flatten()
    }

    pub fn child_count(&self, id: &str) -> usize {
        self.children.get(id).map_or(0, IndexSet::len)
    }

    /// Parent of `id`. `None` for the sentinel root and unknown ids.
    pub fn parent(&self, id: &str) -> Option<&NodeId> {
        self.parents.get(id)
    }

    /// Number of nodes, including the sentinel root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.children.values().map(IndexSet::len).sum()
    }

    /// All node ids in insertion order (the sentinel first).
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Returns the ids from the sentinel root down to `id`, inclusive.
    ///
    /// Returns `None` if the node does not exist.
    pub fn path_to(&self, id: &str) -> Option<Vec<NodeId>> {
        let (start, _) = self.nodes.get_key_value(id)?;
        let mut parts = vec![start.clone()];
        let mut current = start;
        while let Some(parent) = self.parents.get(current.as_str()) {
            // A cycle can only exist in a graph built with from_parts.
            if parts.len() > self.nodes.len() {
                return None;
            }
            parts.push(parent.clone());
            current = parent;
        }
        parts.reverse();
        Some(parts)
    }

    /// Number of edges between the sentinel root and `id`.
    ///
    /// Returns `None` if the node does not exist.
    pub fn depth(&self, id: &str) -> Option<usize> {
        self.path_to(id).map(|path| path.len() - 1)
    }

    /// Pre-order depth-first traversal from the sentinel root.
    ///
    /// Each node is yielded once even if the adjacency maps are malformed.
    pub fn depth_first(&self) -> Vec<&NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut seen = HashSet::new();
        let Some((root, _)) = self.nodes.get_key_value(ROOT_ID) else {
            return order;
        };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            if let Some(kids) = self.children.get(id) {
                stack.extend(kids.iter().rev());
            }
        }
        order
    }

    /// Nodes without children, excluding the sentinel root.
    pub fn leaves(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes
            .keys()
            .filter(move |id| !id.is_root() && self.child_count(id.as_str()) == 0)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Adds a new node under `parent`.
    ///
    /// Returns [`CoreError::DuplicateId`] if `id` already exists anywhere in
    /// the graph, [`CoreError::NodeNotFound`] if `parent` does not, and
    /// [`CoreError::InvalidArgument`] if the node would sit below
    /// [`MAX_DEPTH`].
    pub fn add_child(
        &mut self,
        parent: &NodeId,
        id: NodeId,
        attributes: Attributes,
    ) -> Result<(), CoreError> {
        validate_id(&id)?;
        validate_attributes(&id, &attributes)?;
        let Some(parent_depth) = self.depth(parent.as_str()) else {
            return Err(CoreError::NodeNotFound { id: parent.clone() });
        };
        if self.contains(id.as_str()) {
            return Err(CoreError::DuplicateId { id });
        }
        check_depth(parent_depth + 1)?;
        self.link(parent.clone(), id, attributes);
        Ok(())
    }

    /// Attaches a chain of new nodes beneath an existing anchor.
    ///
    /// The first entry names the anchor, which must already exist. Each later
    /// entry becomes a new node linked as a child of the entry before it.
    /// Attributes given on the anchor entry are merged into the anchor's
    /// existing attributes (not allowed on the sentinel root).
    ///
    /// The whole chain is validated before anything is written, so on error
    /// the graph is unchanged. Returns the number of nodes added.
    pub fn extend_path(&mut self, entries: Vec<PathEntry>) -> Result<usize, CoreError> {
        let mut entries = entries.into_iter();
        let anchor = entries
            .next()
            .ok_or_else(|| CoreError::invalid("path must not be empty"))?;
        let chain: Vec<PathEntry> = entries.collect();

        let Some(anchor_depth) = self.depth(anchor.id.as_str()) else {
            return Err(CoreError::NodeNotFound { id: anchor.id });
        };
        if let Some(attrs) = &anchor.attributes {
            if anchor.id.is_root() && !attrs.is_empty() {
                return Err(CoreError::invalid(
                    "the sentinel root cannot carry attributes",
                ));
            }
            validate_attributes(&anchor.id, attrs)?;
        }

        let mut staged: HashSet<&NodeId> = HashSet::with_capacity(chain.len() + 1);
        staged.insert(&anchor.id);
        for entry in &chain {
            validate_id(&entry.id)?;
            if let Some(attrs) = &entry.attributes {
                validate_attributes(&entry.id, attrs)?;
            }
            if self.contains(entry.id.as_str()) || !staged.insert(&entry.id) {
                return Err(CoreError::DuplicateId {
                    id: entry.id.clone(),
                });
            }
        }
        check_depth(anchor_depth + chain.len())?;

        // Validated; nothing below can fail.
        if let Some(attrs) = anchor.attributes {
            if let Some(existing) = self.nodes.get_mut(anchor.id.as_str()) {
                existing.extend(attrs);
            }
        }
        let added = chain.len();
        let mut parent = anchor.id;
        for entry in chain {
            self.link(parent, entry.id.clone(), entry.attributes.unwrap_or_default());
            parent = entry.id;
        }
        Ok(added)
    }

    // Node first, then the edge.
    fn link(&mut self, parent: NodeId, id: NodeId, attributes: Attributes) {
        self.nodes.insert(id.clone(), attributes);
        self.parents.insert(id.clone(), parent.clone());
        self.children.entry(parent).or_default().insert(id);
    }
}

fn validate_id(id: &NodeId) -> Result<(), CoreError> {
    if id.as_str().is_empty() {
        return Err(CoreError::invalid("node id must not be empty"));
    }
    Ok(())
}

fn validate_attributes(id: &NodeId, attributes: &Attributes) -> Result<(), CoreError> {
    if attributes.contains_key(CHILDREN_KEY) {
        return Err(CoreError::invalid(format!(
            "node '{id}' uses reserved attribute key '{CHILDREN_KEY}'"
        )));
    }
    for (key, value) in attributes {
        if let AttrValue::Float(v) = value {
            if !v.is_finite() {
                return Err(CoreError::invalid(format!(
                    "node '{id}' attribute '{key}' is not a finite number"
                )));
            }
        }
    }
    Ok(())
}

fn check_depth(depth: usize) -> Result<(), CoreError> {
    if depth > MAX_DEPTH {
        return Err(CoreError::invalid(format!(
            "tree would be {depth} levels deep; the limit is {MAX_DEPTH}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> NodeId {
        NodeId::root()
    }

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    #[test]
    fn new_graph_is_just_the_root() {
        let g = TreeGraph::new();
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 0);
        assert!(g.contains(ROOT_ID));
        assert!(g.parent(ROOT_ID).is_none());
        assert_eq!(g.leaves().count(), 0);
    }

    #[test]
    fn add_child_links_parent_and_child() {
        let mut g = TreeGraph::new();
        g.add_child(&root(), id("US"), Attributes::new()).unwrap();
        g.add_child(&id("US"), id("CA"), Attributes::new()).unwrap();

        assert_eq!(g.parent("CA"), Some(&id("US")));
        assert_eq!(g.children("US").collect::<Vec<_>>(), vec![&id("CA")]);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.path_to("CA").unwrap(), vec![root(), id("US"), id("CA")]);
    }

    #[test]
    fn add_child_rejects_duplicate_anywhere() {
        let mut g = TreeGraph::new();
        g.add_child(&root(), id("US"), Attributes::new()).unwrap();
        g.add_child(&id("US"), id("CA"), Attributes::new()).unwrap();

        let err = g.add_child(&root(), id("CA"), Attributes::new()).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { id } if id.as_str() == "CA"));
        let err = g.add_child(&id("CA"), root(), Attributes::new()).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { .. }));
    }

    #[test]
    fn add_child_rejects_missing_parent() {
        let mut g = TreeGraph::new();
        let err = g.add_child(&id("nope"), id("X"), Attributes::new()).unwrap_err();
        assert!(matches!(err, CoreError::NodeNotFound { .. }));
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn add_child_rejects_reserved_attribute() {
        let mut g = TreeGraph::new();
        let mut attrs = Attributes::new();
        attrs.insert(CHILDREN_KEY.into(), AttrValue::Null);
        let err = g.add_child(&root(), id("US"), attrs).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
    }

    #[test]
    fn extend_path_builds_chain() {
        let mut g = TreeGraph::new();
        let added = g
            .extend_path(vec![
                ROOT_ID.into(),
                "US".into(),
                PathEntry::new("CA").attr("pop", 39_000_000),
                "SF".into(),
            ])
            .unwrap();

        assert_eq!(added, 3);
        assert_eq!(g.node_count(), 4);
        assert_eq!(
            g.path_to("SF").unwrap(),
            vec![root(), id("US"), id("CA"), id("SF")]
        );
        assert_eq!(g.attributes("CA").unwrap()["pop"], AttrValue::Int(39_000_000));
        assert!(g.attributes("SF").unwrap().is_empty());
    }

    #[test]
    fn extend_path_from_inner_anchor() {
        let mut g = TreeGraph::new();
        g.extend_path(vec![ROOT_ID.into(), "US".into(), "CA".into()])
            .unwrap();
        g.extend_path(vec!["US".into(), "OH".into()]).unwrap();

        assert_eq!(g.parent("OH"), Some(&id("US")));
        assert_eq!(g.child_count("US"), 2);
    }

    #[test]
    fn extend_path_empty_is_invalid() {
        let mut g = TreeGraph::new();
        let err = g.extend_path(Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
    }

    #[test]
    fn extend_path_missing_anchor_leaves_graph_unchanged() {
        let mut g = TreeGraph::new();
        let before = g.clone();
        let err = g
            .extend_path(vec!["nonexistent".into(), "X".into()])
            .unwrap_err();
        assert!(matches!(err, CoreError::NodeNotFound { id } if id.as_str() == "nonexistent"));
        assert_eq!(g, before);
    }

    #[test]
    fn extend_path_duplicate_is_atomic() {
        let mut g = TreeGraph::new();
        g.extend_path(vec![ROOT_ID.into(), "US".into()]).unwrap();
        let before = g.clone();

        // "IN" and "MH" would be fine on their own; "US" already exists.
        let err = g
            .extend_path(vec![ROOT_ID.into(), "IN".into(), "MH".into(), "US".into()])
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { id } if id.as_str() == "US"));
        assert_eq!(g, before);
        assert!(!g.contains("IN"));
    }

    #[test]
    fn extend_path_rejects_repeat_within_path() {
        let mut g = TreeGraph::new();
        let err = g
            .extend_path(vec![ROOT_ID.into(), "A".into(), "B".into(), "A".into()])
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { .. }));
        assert_eq!(g.node_count(), 1);

        let err = g
            .extend_path(vec![ROOT_ID.into(), ROOT_ID.into()])
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { .. }));
    }

    #[test]
    fn extend_path_merges_anchor_attributes() {
        let mut g = TreeGraph::new();
        g.extend_path(vec![ROOT_ID.into(), PathEntry::new("US").attr("iso", "USA")])
            .unwrap();
        g.extend_path(vec![PathEntry::new("US").attr("pop", 331), "TX".into()])
            .unwrap();

        let us = g.attributes("US").unwrap();
        assert_eq!(us["iso"], AttrValue::from("USA"));
        assert_eq!(us["pop"], AttrValue::Int(331));
    }

    #[test]
    fn extend_path_rejects_root_attributes() {
        let mut g = TreeGraph::new();
        let err = g
            .extend_path(vec![PathEntry::new(ROOT_ID).attr("x", 1), "A".into()])
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn extend_path_rejects_empty_id() {
        let mut g = TreeGraph::new();
        let err = g.extend_path(vec![ROOT_ID.into(), "".into()]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
    }

    fn chain(len: usize) -> Vec<PathEntry> {
        std::iter::once(PathEntry::from(ROOT_ID))
            .chain((0..len).map(|i| PathEntry::new(format!("n{i}"))))
            .collect()
    }

    #[test]
    fn extend_path_allows_max_depth() {
        let mut g = TreeGraph::new();
        assert_eq!(g.extend_path(chain(MAX_DEPTH)).unwrap(), MAX_DEPTH);
        let last = format!("n{}", MAX_DEPTH - 1);
        assert_eq!(g.depth(&last), Some(MAX_DEPTH));
        assert_eq!(g.depth(ROOT_ID), Some(0));
        assert_eq!(g.depth("missing"), None);
    }

    #[test]
    fn extend_path_rejects_too_deep_chain() {
        let mut g = TreeGraph::new();
        let err = g.extend_path(chain(MAX_DEPTH + 1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
        assert_eq!(g.node_count(), 1);

        // The limit counts from the sentinel, not from the anchor.
        g.extend_path(chain(MAX_DEPTH)).unwrap();
        let last = format!("n{}", MAX_DEPTH - 1);
        let err = g
            .extend_path(vec![last.as_str().into(), "below".into()])
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
        let err = g
            .add_child(&id(&last), id("below"), Attributes::new())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
        assert!(!g.contains("below"));
    }

    #[test]
    fn rejects_non_finite_floats() {
        let mut g = TreeGraph::new();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = g
                .extend_path(vec![ROOT_ID.into(), PathEntry::new("US").attr("ratio", bad)])
                .unwrap_err();
            assert!(matches!(err, CoreError::InvalidArgument { .. }));
        }
        assert!(!g.contains("US"));

        g.extend_path(vec![ROOT_ID.into(), "US".into()]).unwrap();
        let err = g
            .extend_path(vec![PathEntry::new("US").attr("ratio", f64::NAN)])
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
        assert!(g.attributes("US").unwrap().is_empty());
    }

    #[test]
    fn depth_first_is_preorder() {
        let mut g = TreeGraph::new();
        g.extend_path(vec![ROOT_ID.into(), "US".into(), "CA".into(), "SF".into()])
            .unwrap();
        g.extend_path(vec!["US".into(), "OH".into()]).unwrap();
        g.extend_path(vec![ROOT_ID.into(), "IN".into()]).unwrap();

        let order: Vec<&str> = g.depth_first().into_iter().map(NodeId::as_str).collect();
        assert_eq!(order, vec![ROOT_ID, "US", "CA", "SF", "OH", "IN"]);

        let mut leaves: Vec<&str> = g.leaves().map(NodeId::as_str).collect();
        leaves.sort();
        assert_eq!(leaves, vec!["IN", "OH", "SF"]);
    }

    #[test]
    fn path_to_unknown_is_none() {
        assert!(TreeGraph::new().path_to("X").is_none());
    }
}
