//! Structural checks over a built graph.
//!
//! Linting never mutates the graph and never fails: every finding comes back
//! as a [`LintIssue`] and the caller decides whether errors abort the run.

use std::collections::HashMap;
use std::fmt;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::model::*;
use crate::traverser::GraphTraverser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One finding of the linter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LintIssue {
    pub severity: Severity,
    pub reason: String,
}

impl LintIssue {
    pub fn error(reason: impl Into<String>) -> Self {
        LintIssue {
            severity: Severity::Error,
            reason: reason.into(),
        }
    }

    pub fn warning(reason: impl Into<String>) -> Self {
        LintIssue {
            severity: Severity::Warning,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.reason)
    }
}

/// Returned by [`LintIssues::into_result`] when at least one issue is an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("graph lint failed with {} error(s)", .errors.len())]
pub struct LintError {
    pub errors: Vec<LintIssue>,
}

/// Helpers over a list of issues.
pub trait LintIssues {
    fn has_errors(&self) -> bool;

    /// `Err` with the error-severity issues if there are any.
    fn into_result(self) -> Result<(), LintError>;
}

impl LintIssues for Vec<LintIssue> {
    fn has_errors(&self) -> bool {
        self.iter().any(|issue| issue.severity == Severity::Error)
    }

    fn into_result(self) -> Result<(), LintError> {
        let errors: Vec<LintIssue> = self
            .into_iter()
            .filter(|issue| issue.severity == Severity::Error)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LintError { errors })
        }
    }
}

/// Runs every graph rule.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphLinter;

impl GraphLinter {
    pub fn new() -> Self {
        GraphLinter
    }

    /// Lint `graph`. Issues come back sorted by severity (errors last) and
    /// reason, so output is stable across runs.
    #[tracing::instrument(skip_all, fields(graph = %graph.name()))]
    pub fn lint(&self, graph: &Graph) -> Vec<LintIssue> {
        let mut issues = lint_link_cycles(graph);
        issues.extend(lint_dependencies(graph));
        issues.sort();
        issues.dedup();
        tracing::debug!(issues = issues.len(), "graph linted");
        issues
    }
}

/// Cycles restricted to the static/dynamic link sub-relation. The linker
/// cannot resolve these, so each one is an error.
fn lint_link_cycles(graph: &Graph) -> Vec<LintIssue> {
    let mut ids: Vec<&NodeId> = graph.all_nodes().map(|node| &node.id).collect();
    ids.sort();

    let mut links: DiGraph<&NodeId, ()> = DiGraph::with_capacity(ids.len(), graph.edge_count());
    let index: HashMap<&NodeId, NodeIndex> = ids
        .iter()
        .map(|id| (*id, links.add_node(*id)))
        .collect();

    let traverser = GraphTraverser::new(graph);
    let mut edges: Vec<DependencyEdge> = graph.all_edges().collect();
    edges.sort();
    for edge in &edges {
        let is_link = traverser
            .dependency_kind(&edge.from, &edge.to)
            .is_some_and(DependencyKind::is_link);
        if !is_link {
            continue;
        }
        if let (Some(from), Some(to)) = (index.get(&edge.from), index.get(&edge.to)) {
            links.add_edge(*from, *to, ());
        }
    }

    tarjan_scc(&links)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|idx| links.find_edge(*idx, *idx).is_some())
        })
        .map(|component| {
            let mut members: Vec<String> = component
                .into_iter()
                .map(|idx| links[idx].to_string())
                .collect();
            members.sort();
            LintIssue::error(format!(
                "Found a link cycle between: {}",
                members.join(", ")
            ))
        })
        .collect()
}

/// Per-edge rules between a target and what it depends on.
fn lint_dependencies(graph: &Graph) -> Vec<LintIssue> {
    let mut issues = Vec::new();

    for (from, source) in graph.targets() {
        for to in graph.edges_from(&from.id) {
            let Some(dependency) = to.as_target() else {
                continue;
            };

            if !platform_compatible(source, dependency) {
                issues.push(LintIssue::error(format!(
                    "Target {} has platform '{}' and depends on target {} of platform '{}'",
                    from.id, source.platform, to.id, dependency.platform
                )));
            }

            if dependency.product.is_app_like() && !may_depend_on_app(source, dependency) {
                issues.push(LintIssue::error(format!(
                    "Target {} of type {} cannot depend on {} of type {}",
                    from.id, source.product, to.id, dependency.product
                )));
            }

            if dependency.product.is_tests_bundle() && !source.product.is_tests_bundle() {
                issues.push(LintIssue::error(format!(
                    "Target {} depends on test target {}",
                    from.id, to.id
                )));
            }

            if dependency.product == Product::Bundle && !source.product.supports_resources() {
                issues.push(LintIssue::warning(format!(
                    "Target {} cannot host resources, bundle {} will not be copied into it",
                    from.id, to.id
                )));
            }
        }
    }

    issues
}

fn platform_compatible(source: &Target, dependency: &Target) -> bool {
    if source.platform == dependency.platform {
        return true;
    }
    // iOS apps embed their companion watch app.
    source.platform == Platform::Ios
        && source.product == Product::App
        && dependency.platform == Platform::WatchOs
        && dependency.product == Product::WatchApp
}

fn may_depend_on_app(source: &Target, dependency: &Target) -> bool {
    if source.product.is_tests_bundle() {
        return true;
    }
    source.product == Product::App
        && matches!(dependency.product, Product::AppClip | Product::WatchApp)
}
