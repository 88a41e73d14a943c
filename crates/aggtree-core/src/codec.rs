//! Conversions between the persisted nested-map form and [`TreeGraph`].
//!
//! [`decode`] walks a document's `root` map and registers every node under
//! the sentinel root. [`encode`] walks the graph depth-first from the
//! sentinel and rebuilds the nested map. For any well-formed document,
//! `encode(&decode(root)?)?` equals `root` (map order aside).

use std::collections::HashSet;

use crate::attr::Attributes;
use crate::document::{NodeMap, NodePayload, TreeDocument, CHILDREN_KEY};
use crate::error::CoreError;
use crate::graph::{TreeGraph, MAX_DEPTH};
use crate::id::NodeId;

/// Builds a graph from the sentinel root's persisted children map.
///
/// Fails with [`CoreError::DuplicateId`] if any id appears twice anywhere in
/// the nested structure, or if the map tries to redefine the sentinel, and
/// with [`CoreError::InvalidArgument`] if it nests deeper than [`MAX_DEPTH`].
pub fn decode(root: &NodeMap) -> Result<TreeGraph, CoreError> {
    let mut graph = TreeGraph::new();
    decode_children(&mut graph, &NodeId::root(), root)?;
    Ok(graph)
}

/// Shorthand for `decode(&doc.root)`.
pub fn decode_document(doc: &TreeDocument) -> Result<TreeGraph, CoreError> {
    decode(&doc.root)
}

fn decode_children(
    graph: &mut TreeGraph,
    parent: &NodeId,
    children: &NodeMap,
) -> Result<(), CoreError> {
    for (id, payload) in children {
        let attributes: Attributes = payload
            .attributes
            .iter()
            .filter(|(key, _)| key.as_str() != CHILDREN_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        graph.add_child(parent, id.clone(), attributes)?;
        if !payload.children.is_empty() {
            decode_children(graph, id, &payload.children)?;
        }
    }
    Ok(())
}

/// Rebuilds the sentinel root's children map from a graph.
///
/// Fails with [`CoreError::Structural`] if the walk reaches a node twice,
/// follows an edge to an unregistered node, descends below [`MAX_DEPTH`],
/// or leaves nodes unreachable from the sentinel. None of these can happen
/// to a graph built through the `TreeGraph` mutation methods.
pub fn encode(graph: &TreeGraph) -> Result<NodeMap, CoreError> {
    let root_key = graph
        .node_ids()
        .find(|id| id.is_root())
        .ok_or_else(|| CoreError::structural("graph has no sentinel root"))?;
    let mut visited: HashSet<&NodeId> = HashSet::with_capacity(graph.node_count());
    visited.insert(root_key);

    let map = encode_children(graph, root_key, 1, &mut visited)?;

    if visited.len() != graph.node_count() {
        return Err(CoreError::structural(format!(
            "{} node(s) unreachable from the sentinel root",
            graph.node_count() - visited.len()
        )));
    }
    Ok(map)
}

fn encode_children<'g>(
    graph: &'g TreeGraph,
    parent: &'g NodeId,
    depth: usize,
    visited: &mut HashSet<&'g NodeId>,
) -> Result<NodeMap, CoreError> {
    let mut map = NodeMap::new();
    if depth > MAX_DEPTH && graph.child_count(parent.as_str()) > 0 {
        return Err(CoreError::structural(format!(
            "node '{parent}' has children below the depth limit of {MAX_DEPTH}"
        )));
    }
    for child in graph.children(parent.as_str()) {
        if !visited.insert(child) {
            return Err(CoreError::structural(format!(
                "node '{child}' reached twice while serializing (parent '{parent}')"
            )));
        }
        let attributes = graph.attributes(child.as_str()).ok_or_else(|| {
            CoreError::structural(format!(
                "edge '{parent}' -> '{child}' points at an unregistered node"
            ))
        })?;
        let payload = NodePayload {
            attributes: attributes.clone(),
            children: encode_children(graph, child, depth + 1, visited)?,
        };
        map.insert(child.clone(), payload);
    }
    Ok(map)
}
