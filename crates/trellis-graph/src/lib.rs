//! Trellis Graph — dependency graph model, store, traverser and linter

pub mod description;
pub mod graph;
pub mod lint;
pub mod mapper;
pub mod model;
pub mod store;
pub mod traverser;


#[cfg(test)]
pub mod test_utils;

pub use description::{DescriptionError, GraphDescription};
pub use graph::Graph;
pub use lint::{GraphLinter, LintError, LintIssue, LintIssues, Severity};
pub use mapper::{GraphAugmenter, GraphMapper, SequentialGraphMapper, TargetActionMapper, TestTargetsPruner};
pub use model::{
    ActionOrder, ActionScript, BinaryKind, DependencyEdge, DependencyKind, DependencyRef, Linking,
    Node, NodeId, NodeKind, Platform, Product, Project, SdkStatus, SettingValue, Settings,
    SettingsDictionary, SourceFile, Target, TargetAction,
};
pub use store::{GraphStore, IntegrityError};
pub use traverser::{GraphTraverser, LinkReference};
