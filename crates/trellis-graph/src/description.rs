//! Serialized graph descriptions.
//!
//! A description is the raw output of a manifest loader: a graph name, the
//! entry projects, the nodes and any explicit edges. Edges declared on
//! targets as [`DependencyRef`]s are resolved here and merged with the
//! explicit ones before the store validates them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::model::*;
use crate::store::IntegrityError;

#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    #[error("failed to read graph description {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed graph description: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDescription {
    pub name: String,
    pub root_path: PathBuf,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<DependencyEdge>,
}

impl GraphDescription {
    pub fn from_json(json: &str) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, DescriptionError> {
        let json = std::fs::read_to_string(path).map_err(|source| DescriptionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Anchor every relative path in the description.
    ///
    /// A relative `root_path` is taken relative to `base`; node, project and
    /// dependency paths are then taken relative to the root. Absolute paths
    /// are kept as they are.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let root = anchor(base, &self.root_path);
        for project in &mut self.projects {
            project.path = anchor(&root, &project.path);
        }
        for node in &mut self.nodes {
            node.id.path = anchor(&root, &node.id.path);
            match &mut node.kind {
                NodeKind::Target(target) => {
                    for dependency in &mut target.dependencies {
                        if let Some(path) = &mut dependency.path {
                            *path = anchor(&root, path);
                        }
                    }
                }
                NodeKind::ProjectReference { project } => *project = anchor(&root, project),
                _ => {}
            }
        }
        for edge in &mut self.edges {
            edge.from.path = anchor(&root, &edge.from.path);
            edge.to.path = anchor(&root, &edge.to.path);
        }
        self.root_path = root;
        self
    }

    /// Explicit edges followed by the edges declared on targets.
    pub fn resolved_edges(&self) -> Vec<DependencyEdge> {
        let declared = self.nodes.iter().flat_map(|node| {
            let dependencies = node
                .as_target()
                .map(|target| target.dependencies.as_slice())
                .unwrap_or_default();
            dependencies
                .iter()
                .map(move |dependency| {
                    DependencyEdge::new(node.id.clone(), dependency.resolve(&node.id.path))
                })
        });
        self.edges.iter().cloned().chain(declared).collect()
    }

    /// Validate the description and build the graph.
    pub fn into_graph(self) -> Result<Graph, DescriptionError> {
        let edges = self.resolved_edges();
        tracing::debug!(
            graph = %self.name,
            nodes = self.nodes.len(),
            edges = edges.len(),
            "loading graph description"
        );
        let graph = Graph::build(self.name, self.root_path, self.projects, self.nodes, edges)?;
        Ok(graph)
    }
}

/// `path` joined onto `base` unless already absolute. Collecting the
/// components drops `.` segments, so `root/.` and `root` compare equal.
fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.components().collect()
    } else {
        base.join(path).components().collect()
    }
}
