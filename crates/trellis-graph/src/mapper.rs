//! Whole-graph transformations.
//!
//! A mapper never edits the graph it receives. It returns a new [`Graph`]
//! that shares every untouched node with the input, so readers of the old
//! graph keep a consistent view.

use crate::graph::Graph;
use crate::model::*;
use crate::store::IntegrityError;

pub trait GraphMapper: Send + Sync {
    fn map(&self, graph: &Graph) -> Result<Graph, IntegrityError>;
}

/// Runs mappers one after another, each on the previous one's output.
#[derive(Default)]
pub struct SequentialGraphMapper {
    mappers: Vec<Box<dyn GraphMapper>>,
}

impl SequentialGraphMapper {
    pub fn new(mappers: Vec<Box<dyn GraphMapper>>) -> Self {
        SequentialGraphMapper { mappers }
    }

    pub fn push(mut self, mapper: impl GraphMapper + 'static) -> Self {
        self.mappers.push(Box::new(mapper));
        self
    }
}

impl GraphMapper for SequentialGraphMapper {
    fn map(&self, graph: &Graph) -> Result<Graph, IntegrityError> {
        let mut current = graph.clone();
        for mapper in &self.mappers {
            current = mapper.map(&current)?;
        }
        Ok(current)
    }
}

/// Injects extra nodes and edges, e.g. products resolved by a dependency
/// manager, before the graph is traversed.
#[derive(Debug, Clone, Default)]
pub struct GraphAugmenter {
    pub nodes: Vec<Node>,
    pub edges: Vec<DependencyEdge>,
}

impl GraphMapper for GraphAugmenter {
    fn map(&self, graph: &Graph) -> Result<Graph, IntegrityError> {
        graph.with_additions(self.nodes.clone(), self.edges.clone())
    }
}

type NodePredicate = Box<dyn Fn(&Node) -> bool + Send + Sync>;

/// Appends a build action to every target accepted by the filter.
pub struct TargetActionMapper {
    action: TargetAction,
    filter: NodePredicate,
}

impl TargetActionMapper {
    pub fn new(action: TargetAction, filter: impl Fn(&Node) -> bool + Send + Sync + 'static) -> Self {
        TargetActionMapper {
            action,
            filter: Box::new(filter),
        }
    }
}

impl GraphMapper for TargetActionMapper {
    fn map(&self, graph: &Graph) -> Result<Graph, IntegrityError> {
        graph.map_nodes(|node| {
            let target = node.as_target()?;
            if !(self.filter)(node) {
                return None;
            }
            let mut target = target.clone();
            target.actions.push(self.action.clone());
            Some(Node::target(node.id.clone(), target))
        })
    }
}

/// Drops test bundles and their edges, for runs that only build products.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestTargetsPruner;

impl GraphMapper for TestTargetsPruner {
    fn map(&self, graph: &Graph) -> Result<Graph, IntegrityError> {
        graph.without_nodes(Node::is_tests_bundle)
    }
}
