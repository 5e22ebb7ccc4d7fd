//! Immutable node/edge storage addressed by `NodeId`

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::{DependencyEdge, Node, NodeId};

/// Structural problems found while building a [`GraphStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// Two nodes share the same identity key.
    #[error("duplicate node {0}")]
    DuplicateNode(NodeId),

    /// An edge points from or to a node that is not part of the graph.
    #[error("edge {from} -> {to} references unknown node {missing}")]
    DanglingReference {
        from: NodeId,
        to: NodeId,
        missing: NodeId,
    },
}

/// Node and edge storage. Read-only once built; every lookup is a hash map
/// access.
#[derive(Clone, Default)]
pub struct GraphStore {
    nodes: HashMap<NodeId, Arc<Node>>,
    /// Outgoing edges grouped by source, in first-declared order.
    outgoing: HashMap<NodeId, Vec<NodeId>>,
    /// Incoming edges grouped by target.
    incoming: HashMap<NodeId, Vec<NodeId>>,
    /// Containing path → ids of the nodes declared there, sorted.
    by_path: BTreeMap<PathBuf, Vec<NodeId>>,
    edge_count: usize,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("node_count", &self.nodes.len())
            .field("edge_count", &self.edge_count)
            .finish()
    }
}

impl GraphStore {
    /// Validate and index `nodes` and `edges`.
    ///
    /// Fails on the first duplicate identity or dangling edge endpoint.
    /// Repeated edges collapse into one.
    pub fn build<N, E>(nodes: N, edges: E) -> Result<Self, IntegrityError>
    where
        N: IntoIterator,
        N::Item: Into<Arc<Node>>,
        E: IntoIterator<Item = DependencyEdge>,
    {
        let mut store = GraphStore::default();

        for node in nodes {
            let node: Arc<Node> = node.into();
            if store.nodes.contains_key(&node.id) {
                return Err(IntegrityError::DuplicateNode(node.id.clone()));
            }
            store
                .by_path
                .entry(node.id.path.clone())
                .or_default()
                .push(node.id.clone());
            store.nodes.insert(node.id.clone(), node);
        }

        let mut seen: HashSet<DependencyEdge> = HashSet::new();
        for edge in edges {
            for endpoint in [&edge.from, &edge.to] {
                if !store.nodes.contains_key(endpoint) {
                    return Err(IntegrityError::DanglingReference {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
            if !seen.insert(edge.clone()) {
                continue;
            }
            store
                .incoming
                .entry(edge.to.clone())
                .or_default()
                .push(edge.from.clone());
            store.outgoing.entry(edge.from).or_default().push(edge.to);
            store.edge_count += 1;
        }

        for ids in store.by_path.values_mut() {
            ids.sort();
        }

        tracing::trace!(
            nodes = store.nodes.len(),
            edges = store.edge_count,
            "graph store built"
        );
        Ok(store)
    }

    /// Look up a node. `None` means "not part of this graph".
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(Arc::as_ref)
    }

    /// The shared handle for a node, for building derived graphs.
    pub fn node_arc(&self, id: &NodeId) -> Option<&Arc<Node>> {
        self.nodes.get(id)
    }

    /// Targets of the edges leaving `id`.
    pub fn edges(&self, id: &NodeId) -> &[NodeId] {
        self.outgoing.get(id).map_or(&[], Vec::as_slice)
    }

    /// Sources of the edges entering `id`.
    pub fn dependents(&self, id: &NodeId) -> &[NodeId] {
        self.incoming.get(id).map_or(&[], Vec::as_slice)
    }

    /// Ids of the nodes whose containing path is `path`, sorted.
    pub fn nodes_at(&self, path: &Path) -> &[NodeId] {
        self.by_path.get(path).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate over all nodes, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(Arc::as_ref)
    }

    /// Iterate over all shared node handles, in no particular order.
    pub fn node_arcs(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.nodes.values()
    }

    /// Iterate over all edges, in no particular order.
    pub fn all_edges(&self) -> impl Iterator<Item = DependencyEdge> + '_ {
        self.outgoing.iter().flat_map(|(from, targets)| {
            targets
                .iter()
                .map(move |to| DependencyEdge::new(from.clone(), to.clone()))
        })
    }

    /// Containing paths that declare at least one node, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.by_path.keys().map(PathBuf::as_path)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}
