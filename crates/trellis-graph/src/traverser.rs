//! Graph queries used during generation and build orchestration.
//!
//! Every transitive query goes through [`GraphTraverser::filter_dependencies`],
//! an iterative depth-first walk with an explicit visited set. The walk is
//! O(V+E) and terminates on cyclic input; rejecting link cycles is the
//! linter's job, not the traverser's.
//!
//! Results are sets. Callers that need a stable order sort by [`NodeId`].

use std::collections::HashSet;
use std::path::Path;

use crate::graph::Graph;
use crate::model::*;

/// A static link reference: the target plus the file the linker sees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkReference {
    pub target: NodeId,
    pub product_name: String,
}

/// Stateless, re-entrant query engine over a [`Graph`].
#[derive(Debug, Clone, Copy)]
pub struct GraphTraverser<'g> {
    graph: &'g Graph,
}

impl<'g> GraphTraverser<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        GraphTraverser { graph }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// The target node named `name` in the project at `path`.
    pub fn target(&self, path: &Path, name: &str) -> Option<&'g Node> {
        self.graph
            .node(&NodeId::new(path, name))
            .filter(|node| node.as_target().is_some())
    }

    /// All target nodes declared in the project at `path`.
    pub fn targets_at(&self, path: &Path) -> HashSet<&'g Node> {
        let store = self.graph.store();
        store
            .nodes_at(path)
            .iter()
            .filter_map(|id| store.node(id))
            .filter(|node| node.as_target().is_some())
            .collect()
    }

    /// Collect the nodes reachable from `root` that pass `test`.
    ///
    /// `root` is neither returned nor passed to the predicates. When `skip`
    /// returns true for a node, the walk does not expand that node's own
    /// dependencies. An unknown root yields an empty set.
    pub fn filter_dependencies<T, S>(&self, root: &NodeId, test: T, skip: S) -> HashSet<&'g Node>
    where
        T: Fn(&Node) -> bool,
        S: Fn(&Node) -> bool,
    {
        let store = self.graph.store();
        let mut found = HashSet::new();
        let Some(root_node) = store.node(root) else {
            return found;
        };

        let mut visited: HashSet<&'g NodeId> = HashSet::from([&root_node.id]);
        let mut stack: Vec<&'g NodeId> = store.edges(&root_node.id).iter().rev().collect();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = store.node(id) else {
                continue;
            };
            if test(node) {
                found.insert(node);
            }
            if skip(node) {
                continue;
            }
            stack.extend(
                store
                    .edges(id)
                    .iter()
                    .rev()
                    .filter(|next| !visited.contains(next)),
            );
        }

        found
    }

    /// One hop: the nodes `root` has an edge to.
    pub fn direct_dependencies(&self, root: &NodeId) -> HashSet<&'g Node> {
        let graph = self.graph;
        graph
            .store()
            .edges(root)
            .iter()
            .filter_map(|id| graph.node(id))
            .collect()
    }

    /// Target nodes `root` depends on directly.
    pub fn direct_target_dependencies(&self, root: &NodeId) -> HashSet<&'g Node> {
        self.direct_dependencies(root)
            .into_iter()
            .filter(|node| node.as_target().is_some())
            .collect()
    }

    /// Everything reachable from `root`.
    pub fn transitive_closure(&self, root: &NodeId) -> HashSet<&'g Node> {
        self.filter_dependencies(root, |_| true, |_| false)
    }

    /// Resource bundles `root` must copy into its product.
    ///
    /// The walk stops at the first node that can host resources itself, so a
    /// bundle is claimed by its nearest host and never by a grandparent.
    pub fn resource_bundle_dependencies(&self, root: &NodeId) -> HashSet<&'g Node> {
        let hosts_resources = self.graph.node(root).is_some_and(Node::supports_resources);
        if !hosts_resources {
            return HashSet::new();
        }
        self.filter_dependencies(
            root,
            |node| node.product() == Some(Product::Bundle),
            Node::supports_resources,
        )
    }

    /// Direct dependencies that are app extensions to embed.
    pub fn app_extension_dependencies(&self, root: &NodeId) -> HashSet<&'g Node> {
        self.direct_dependencies(root)
            .into_iter()
            .filter(|node| node.product().is_some_and(Product::is_app_extension))
            .collect()
    }

    /// The app clip `root` embeds, if any. With several, the smallest id wins.
    pub fn app_clip_dependency(&self, root: &NodeId) -> Option<&'g Node> {
        self.direct_dependencies(root)
            .into_iter()
            .filter(|node| node.product() == Some(Product::AppClip))
            .min_by(|a, b| a.id.cmp(&b.id))
    }

    /// Test bundles, anywhere in the graph, with a direct edge to `root`.
    pub fn test_targets_depending_on(&self, root: &NodeId) -> HashSet<&'g Node> {
        let graph = self.graph;
        graph
            .store()
            .dependents(root)
            .iter()
            .filter_map(|id| graph.node(id))
            .filter(|node| node.is_tests_bundle())
            .collect()
    }

    /// The flattened set of statically linked nodes `root` links against.
    ///
    /// The walk continues through static nodes, whose own static
    /// dependencies end up in the same binary, and stops at anything else: a
    /// dynamic framework links its statics into itself.
    pub fn static_link_dependencies(&self, root: &NodeId) -> HashSet<&'g Node> {
        self.filter_dependencies(root, Node::is_static_linkable, |node| {
            !node.is_static_linkable()
        })
    }

    /// One hop static link references with their product file names.
    pub fn direct_static_dependencies(&self, root: &NodeId) -> HashSet<LinkReference> {
        self.direct_dependencies(root)
            .into_iter()
            .filter(|node| node.as_target().is_some() && node.is_static_linkable())
            .map(|node| LinkReference {
                target: node.id.clone(),
                product_name: node.product_name_with_extension(),
            })
            .collect()
    }

    /// What `root` hands to the linker: its direct dynamic dependencies plus
    /// the flattened static link set.
    pub fn linkable_dependencies(&self, root: &NodeId) -> HashSet<&'g Node> {
        let mut linkable: HashSet<&'g Node> = self
            .direct_dependencies(root)
            .into_iter()
            .filter(|node| node.is_dynamic_linkable())
            .collect();
        linkable.extend(self.static_link_dependencies(root));
        linkable
    }

    /// Everything reachable from any target declared at `path`.
    pub fn all_dependencies(&self, path: &Path) -> HashSet<&'g Node> {
        self.targets_at(path)
            .into_iter()
            .flat_map(|target| self.transitive_closure(&target.id))
            .collect()
    }

    /// Whether any node depends on a package product.
    pub fn has_packages(&self) -> bool {
        self.graph.all_edges().any(|edge| {
            matches!(
                self.graph.node(&edge.to).map(|node| &node.kind),
                Some(NodeKind::PackageProduct { .. })
            )
        })
    }

    /// The inferred kind of the edge `from → to`, or `None` when there is no
    /// such edge.
    pub fn dependency_kind(&self, from: &NodeId, to: &NodeId) -> Option<DependencyKind> {
        if !self.graph.has_edge_between(from, to) {
            return None;
        }
        let source = self.graph.node(from)?;
        let target = self.graph.node(to)?;
        Some(DependencyKind::infer(source, target))
    }

    /// Non-test targets of the entry projects, sorted by id. These are what a
    /// build command schedules when no scheme is named.
    pub fn buildable_entry_targets(&self) -> Vec<&'g Node> {
        let mut targets: Vec<&'g Node> = self
            .graph
            .entry_projects()
            .iter()
            .flat_map(|project| self.targets_at(&project.path))
            .filter(|node| !node.is_tests_bundle())
            .collect();
        targets.sort_by(|a, b| a.id.cmp(&b.id));
        targets.dedup_by(|a, b| a.id == b.id);
        targets
    }
}

/// Sort a query result by identity for deterministic output.
pub fn sorted<'g>(nodes: impl IntoIterator<Item = &'g Node>) -> Vec<&'g Node> {
    let mut nodes: Vec<&'g Node> = nodes.into_iter().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    nodes
}
