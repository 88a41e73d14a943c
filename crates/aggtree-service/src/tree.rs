//! The [`AggregationTree`] facade: construct or load a tree, extend it with
//! paths, and persist it through a [`DocumentStore`].
//!
//! The tree's id, name and graph sit behind one `Mutex` owned by the
//! instance. Every operation, including the whole serialize-and-store
//! sequence in [`AggregationTree::save`], runs under that lock, so saves
//! never interleave with each other or with mutations. The guard is released
//! on every exit path.

use std::sync::{Mutex, MutexGuard, PoisonError};

use aggtree_core::{
    decode_document, encode, CoreError, DocId, PathEntry, TreeDocument, TreeGraph,
};
use aggtree_storage::{load_document, save_document, DocumentStore};

use crate::error::TreeError;

#[derive(Debug)]
struct TreeState {
    id: Option<DocId>,
    name: String,
    graph: TreeGraph,
}

/// A hierarchical classification tree (e.g. country -> state -> city).
#[derive(Debug)]
pub struct AggregationTree {
    state: Mutex<TreeState>,
}

impl AggregationTree {
    /// Creates a fresh, unsaved tree holding only the sentinel root.
    pub fn create(name: &str) -> Result<Self, TreeError> {
        validate_name(name)?;
        Ok(Self::from_state(TreeState {
            id: None,
            name: name.to_string(),
            graph: TreeGraph::new(),
        }))
    }

    /// Loads a tree from `store`.
    ///
    /// Fails with [`TreeError::NotFound`] if no aggregation tree is stored
    /// under `id`, and with a duplicate-id error if the stored document
    /// repeats a node id.
    pub fn load<S>(store: &S, id: &DocId) -> Result<Self, TreeError>
    where
        S: DocumentStore + ?Sized,
    {
        let doc: TreeDocument = load_document(store, id).map_err(|e| {
            tracing::warn!(%id, error = %e, "aggregation tree load failed");
            TreeError::from(e)
        })?;
        let tree = Self::from_document(doc)?;
        tracing::debug!(%id, nodes = tree.node_count(), "loaded aggregation tree");
        Ok(tree)
    }

    /// Loads several trees, failing on the first one that cannot be loaded.
    pub fn load_many<S>(store: &S, ids: &[DocId]) -> Result<Vec<Self>, TreeError>
    where
        S: DocumentStore + ?Sized,
    {
        ids.iter().map(|id| Self::load(store, id)).collect()
    }

    /// Builds a tree from an already fetched document.
    pub fn from_document(doc: TreeDocument) -> Result<Self, TreeError> {
        let graph = decode_document(&doc)?;
        Ok(Self::from_state(TreeState {
            id: doc.id,
            name: doc.name,
            graph,
        }))
    }

    fn from_state(state: TreeState) -> Self {
        AggregationTree {
            state: Mutex::new(state),
        }
    }

    // Graph writes only happen after a path is fully validated, so the state
    // behind a poisoned lock is still a well-formed tree.
    fn state(&self) -> MutexGuard<'_, TreeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Store-assigned id; `None` until the first save.
    pub fn id(&self) -> Option<DocId> {
        self.state().id.clone()
    }

    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    /// Renames the tree. Uniqueness among trees is not checked here.
    pub fn set_name(&self, name: &str) -> Result<(), TreeError> {
        validate_name(name)?;
        self.state().name = name.to_string();
        Ok(())
    }

    /// Number of nodes, including the sentinel root.
    pub fn node_count(&self) -> usize {
        self.state().graph.node_count()
    }

    /// Runs `f` against the graph while holding the tree's lock.
    ///
    /// `f` must not call back into this tree: every method takes the same
    /// lock, so doing so deadlocks.
    pub fn with_graph<R>(&self, f: impl FnOnce(&TreeGraph) -> R) -> R {
        f(&self.state().graph)
    }

    /// Serializes the current graph into a document, without storing it.
    pub fn to_document(&self) -> Result<TreeDocument, TreeError> {
        let state = self.state();
        snapshot(&state)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Adds a chain of nodes beneath an existing anchor.
    ///
    /// The first entry must name an existing node (the sentinel root or any
    /// other); each later entry becomes a new child of the entry before it.
    /// On error nothing is added. Returns the number of nodes added.
    pub fn add_path<I>(&self, entries: I) -> Result<usize, TreeError>
    where
        I: IntoIterator,
        I::Item: Into<PathEntry>,
    {
        let entries: Vec<PathEntry> = entries.into_iter().map(Into::into).collect();
        let mut state = self.state();
        match state.graph.extend_path(entries) {
            Ok(added) => {
                tracing::debug!(tree = %state.name, added, "extended aggregation tree");
                Ok(added)
            }
            Err(err) => {
                tracing::debug!(tree = %state.name, error = %err, "rejected path");
                Err(err.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Serializes the graph and writes it through `store`, returning the id.
    ///
    /// The first save allocates an id, which later saves reuse. The instance
    /// lock is held from serialization until the store call returns.
    pub fn save<S>(&self, store: &S) -> Result<DocId, TreeError>
    where
        S: DocumentStore + ?Sized,
    {
        let mut state = self.state();
        let doc = snapshot(&state)?;
        let id = save_document(store, &doc)?;
        tracing::info!(%id, tree = %state.name, nodes = doc.node_count(), "saved aggregation tree");
        state.id = Some(id.clone());
        Ok(id)
    }
}

fn snapshot(state: &TreeState) -> Result<TreeDocument, TreeError> {
    let root = encode(&state.graph)?;
    Ok(TreeDocument {
        id: state.id.clone(),
        name: state.name.clone(),
        root,
    })
}

fn validate_name(name: &str) -> Result<(), TreeError> {
    if name.trim().is_empty() {
        return Err(CoreError::InvalidArgument {
            reason: "tree name must not be empty".to_string(),
        }
        .into());
    }
    Ok(())
}
