//! The dependency graph value and its copy-on-write derivations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::*;
use crate::store::{GraphStore, IntegrityError};

/// The dependency graph of one invocation.
///
/// Immutable: every transformation returns a new `Graph`. Clones are cheap
/// because the store and its nodes are shared.
#[derive(Clone)]
pub struct Graph {
    name: String,
    root_path: PathBuf,
    entry_projects: Vec<Project>,
    store: Arc<GraphStore>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("node_count", &self.store.node_count())
            .field("edge_count", &self.store.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new(
        name: impl Into<String>,
        root_path: impl Into<PathBuf>,
        entry_projects: Vec<Project>,
        store: GraphStore,
    ) -> Self {
        Graph {
            name: name.into(),
            root_path: root_path.into(),
            entry_projects,
            store: Arc::new(store),
        }
    }

    /// Validate `nodes` and `edges` and wrap them in a graph.
    pub fn build<N>(
        name: impl Into<String>,
        root_path: impl Into<PathBuf>,
        entry_projects: Vec<Project>,
        nodes: N,
        edges: Vec<DependencyEdge>,
    ) -> Result<Self, IntegrityError>
    where
        N: IntoIterator,
        N::Item: Into<Arc<Node>>,
    {
        let store = GraphStore::build(nodes, edges)?;
        Ok(Graph::new(name, root_path, entry_projects, store))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn entry_projects(&self) -> &[Project] {
        &self.entry_projects
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Get a node by ID.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.store.node(id)
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.store.edge_count()
    }

    /// Iterate over all nodes.
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.store.nodes()
    }

    /// Iterate over all edges.
    pub fn all_edges(&self) -> impl Iterator<Item = DependencyEdge> + '_ {
        self.store.all_edges()
    }

    /// Get all nodes `id` depends on directly.
    pub fn edges_from(&self, id: &NodeId) -> impl Iterator<Item = &Node> {
        self.store
            .edges(id)
            .iter()
            .filter_map(move |to| self.store.node(to))
    }

    /// Get all nodes that depend on `id` directly.
    pub fn edges_to(&self, id: &NodeId) -> impl Iterator<Item = &Node> {
        self.store
            .dependents(id)
            .iter()
            .filter_map(move |from| self.store.node(from))
    }

    /// Check if `from` has a direct edge to `to`.
    pub fn has_edge_between(&self, from: &NodeId, to: &NodeId) -> bool {
        self.store.edges(from).contains(to)
    }

    /// Iterate over all target nodes.
    pub fn targets(&self) -> impl Iterator<Item = (&Node, &Target)> {
        self.store
            .nodes()
            .filter_map(|node| node.as_target().map(|target| (node, target)))
    }

    /// A new graph with `nodes` and `edges` added. Used by augmenters that
    /// inject synthetic or third-party nodes before traversal.
    pub fn with_additions(
        &self,
        nodes: Vec<Node>,
        edges: Vec<DependencyEdge>,
    ) -> Result<Graph, IntegrityError> {
        let all_nodes = self
            .store
            .node_arcs()
            .cloned()
            .chain(nodes.into_iter().map(Arc::new));
        let all_edges: Vec<DependencyEdge> = self.store.all_edges().chain(edges).collect();
        self.derive(all_nodes, all_edges)
    }

    /// A new graph where `transform` may replace nodes. Returning `None`
    /// keeps the node as is; unchanged nodes are shared with `self`.
    pub fn map_nodes<F>(&self, mut transform: F) -> Result<Graph, IntegrityError>
    where
        F: FnMut(&Node) -> Option<Node>,
    {
        let nodes: Vec<Arc<Node>> = self
            .store
            .node_arcs()
            .map(|node| match transform(node) {
                Some(replacement) => Arc::new(replacement),
                None => Arc::clone(node),
            })
            .collect();
        let edges: Vec<DependencyEdge> = self.store.all_edges().collect();
        self.derive(nodes, edges)
    }

    /// A new graph without the nodes matching `predicate` and their edges.
    pub fn without_nodes<F>(&self, predicate: F) -> Result<Graph, IntegrityError>
    where
        F: Fn(&Node) -> bool,
    {
        let nodes: Vec<Arc<Node>> = self
            .store
            .node_arcs()
            .filter(|node| !predicate(node))
            .cloned()
            .collect();
        let kept = |id: &NodeId| self.store.node(id).is_some_and(|node| !predicate(node));
        let edges: Vec<DependencyEdge> = self
            .store
            .all_edges()
            .filter(|edge| kept(&edge.from) && kept(&edge.to))
            .collect();
        self.derive(nodes, edges)
    }

    fn derive<N>(&self, nodes: N, edges: Vec<DependencyEdge>) -> Result<Graph, IntegrityError>
    where
        N: IntoIterator<Item = Arc<Node>>,
    {
        let store = GraphStore::build(nodes, edges)?;
        tracing::debug!(
            graph = %self.name,
            nodes = store.node_count(),
            edges = store.edge_count(),
            "derived graph"
        );
        Ok(Graph::new(
            self.name.clone(),
            self.root_path.clone(),
            self.entry_projects.clone(),
            store,
        ))
    }
}
