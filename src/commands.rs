//! CLI command implementations

use anyhow::{Context, bail};
use std::path::Path;
use std::sync::Arc;
use trellis_cache::{CacheOutputType, ContentHasher, DiskSource, HashReport, TrellisConfig};
use trellis_graph::traverser::sorted;
use trellis_graph::{Graph, GraphDescription, GraphLinter, GraphTraverser, LintIssues, Node};

use crate::Query;

pub const DEFAULT_GRAPH_FILE: &str = "graph.json";

/// Load the description and anchor its relative paths at the repository root.
fn load_graph(root: &Path, graph_file: &Path) -> anyhow::Result<Graph> {
    let root = std::path::absolute(root)
        .with_context(|| format!("Failed to resolve root {}", root.display()))?;
    let graph = GraphDescription::from_path(graph_file)
        .map(|description| description.resolve_paths(&root))
        .and_then(GraphDescription::into_graph)
        .with_context(|| format!("Failed to load graph from {}", graph_file.display()))?;
    tracing::info!(
        "Loaded graph '{}': {} nodes, {} edges",
        graph.name(),
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

pub fn lint(root: &Path, graph_file: &Path) -> anyhow::Result<()> {
    let graph = load_graph(root, graph_file)?;
    let issues = GraphLinter::new().lint(&graph);

    for issue in &issues {
        println!("{issue}");
    }
    if issues.is_empty() {
        tracing::info!("No issues found");
    }

    issues.into_result()?;
    Ok(())
}

pub fn deps(
    root: &Path,
    graph_file: &Path,
    target: &str,
    path: Option<&Path>,
    query: Query,
) -> anyhow::Result<()> {
    let graph = load_graph(root, graph_file)?;
    let traverser = GraphTraverser::new(&graph);
    let root = find_target(&graph, target, path)?;
    let id = &root.id;

    let nodes = match query {
        Query::Direct => traverser.direct_dependencies(id),
        Query::Transitive => traverser.transitive_closure(id),
        Query::Static => traverser.static_link_dependencies(id),
        Query::Resources => traverser.resource_bundle_dependencies(id),
        Query::Extensions => traverser.app_extension_dependencies(id),
        Query::Tests => traverser.test_targets_depending_on(id),
        Query::Linkable => traverser.linkable_dependencies(id),
    };

    for node in sorted(nodes) {
        println!("{}", node.id);
    }
    Ok(())
}

pub fn hash(
    root: &Path,
    graph_file: &Path,
    profile: Option<&str>,
    output: CacheOutputType,
    write: bool,
) -> anyhow::Result<()> {
    let config = TrellisConfig::load(root)?;
    let profile = config.cache.profile(profile)?;
    let graph = load_graph(root, graph_file)?;

    let hasher = ContentHasher::new(graph.clone(), Arc::new(DiskSource));
    let hashes = hasher
        .content_hashes(profile, output)
        .context("Failed to compute content hashes")?;

    let report = HashReport::new(graph.name(), profile, output, &hashes);
    for (target, hash) in &report.hashes {
        println!("{hash}  {target}");
    }

    if write {
        let cache_dir = config.cache_dir(root);
        if let Some(previous) = HashReport::load(&cache_dir, &profile.name, output)? {
            let diff = report.diff(&previous);
            tracing::info!(
                "Since {}: {} added, {} removed, {} changed",
                previous.generated_at.to_rfc3339(),
                diff.added.len(),
                diff.removed.len(),
                diff.changed.len()
            );
            for target in &diff.changed {
                tracing::info!("changed: {}", target);
            }
        }
        let path = report.save(&cache_dir)?;
        tracing::info!("Hash report written to {}", path.display());
    }
    Ok(())
}

pub fn targets(root: &Path, graph_file: &Path) -> anyhow::Result<()> {
    let graph = load_graph(root, graph_file)?;
    for node in GraphTraverser::new(&graph).buildable_entry_targets() {
        println!("{}", node.id);
    }
    Ok(())
}

pub fn clear(root: &Path) -> anyhow::Result<()> {
    let config = TrellisConfig::load(root)?;
    let cache_dir = config.cache_dir(root);
    tracing::info!("Clearing cache: {}", cache_dir.display());

    if trellis_cache::clear_cache(&cache_dir)? {
        tracing::info!("Cache cleared");
    } else {
        tracing::info!("Nothing to clear");
    }
    Ok(())
}

/// The target named `name`, restricted to `path` when given. A relative
/// `path` is taken relative to the graph root.
fn find_target<'g>(graph: &'g Graph, name: &str, path: Option<&Path>) -> anyhow::Result<&'g Node> {
    let path = path.map(|path| graph.root_path().join(path));
    let candidates: Vec<&Node> = sorted(
        graph
            .targets()
            .map(|(node, _)| node)
            .filter(|node| node.name() == name)
            .filter(|node| path.as_deref().is_none_or(|path| node.path() == path)),
    );

    match candidates.as_slice() {
        [] => bail!("No target named '{}'", name),
        [node] => Ok(*node),
        [..] => {
            let ids: Vec<String> = candidates.iter().map(|node| node.id.to_string()).collect();
            bail!(
                "Target name '{}' is ambiguous, pass --path: {}",
                name,
                ids.join(", ")
            )
        }
    }
}
