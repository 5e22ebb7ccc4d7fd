//! Integration tests for Trellis
//!
//! These tests drive the graph, cache and CLI layers together against a
//! workspace written to a temporary directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use trellis_cache::{CacheOutputType, CacheProfile, ContentHasher, DiskSource, HashReport};
use trellis_graph::{
    GraphDescription, GraphLinter, GraphMapper, GraphTraverser, NodeId, TestTargetsPruner,
};

/// App → {Core, Kit}, Core → Kit, AppTests → App, with sources on disk.
fn write_workspace(root: &Path) -> PathBuf {
    let app = root.join("App");
    let core = root.join("Core");
    for (path, contents) in [
        (app.join("Sources/AppDelegate.swift"), "@main struct App {}"),
        (app.join("Tests/AppTests.swift"), "final class AppTests {}"),
        (core.join("Sources/Core.swift"), "public struct Core {}"),
        (core.join("Sources/Kit.swift"), "public struct Kit {}"),
    ] {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    let description = json!({
        "name": "Workspace",
        "root_path": root,
        "projects": [{ "path": app, "name": "App" }],
        "nodes": [
            {
                "path": app, "name": "App", "kind": "target", "product": "app", "platform": "ios",
                "sources": [{ "path": "Sources/AppDelegate.swift" }],
                "dependencies": [{ "name": "Core", "path": core }, { "name": "Kit", "path": core }]
            },
            {
                "path": app, "name": "AppTests", "kind": "target", "product": "unit_tests", "platform": "ios",
                "sources": [{ "path": "Tests/AppTests.swift" }],
                "dependencies": [{ "name": "App" }]
            },
            {
                "path": core, "name": "Core", "kind": "target", "product": "framework", "platform": "ios",
                "sources": [{ "path": "Sources/Core.swift" }],
                "dependencies": [{ "name": "Kit" }]
            },
            {
                "path": core, "name": "Kit", "kind": "target", "product": "static_library", "platform": "ios",
                "sources": [{ "path": "Sources/Kit.swift" }]
            }
        ]
    });
    let graph_file = root.join("graph.json");
    std::fs::write(&graph_file, serde_json::to_string_pretty(&description).unwrap()).unwrap();
    graph_file
}

fn trellis(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trellis"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute trellis")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = Command::new(env!("CARGO_BIN_EXE_trellis"))
        .arg("--help")
        .output()
        .expect("Failed to execute trellis");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Dependency graph queries, linting and build cache keys"));
}

#[test]
fn test_cli_queries() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_workspace(root);
    let core = root.join("Core");

    let output = trellis(root, &["targets"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec![NodeId::new(root.join("App"), "App").to_string()]
    );

    let output = trellis(root, &["deps", "--target", "App", "--query", "static"]);
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec![NodeId::new(&core, "Kit").to_string()]);

    let output = trellis(root, &["deps", "--target", "Kit", "--query", "transitive"]);
    assert!(output.status.success());
    assert!(stdout_lines(&output).is_empty());

    let output = trellis(root, &["deps", "--target", "Missing"]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_lint() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_workspace(root);

    let output = trellis(root, &["lint"]);
    assert!(output.status.success());
    assert!(stdout_lines(&output).is_empty());

    // Kit → Core closes a link cycle with Core → Kit.
    let graph_file = root.join("graph.json");
    let mut description: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&graph_file).unwrap()).unwrap();
    description["nodes"][3]["dependencies"] = json!([{ "name": "Core" }]);
    std::fs::write(&graph_file, description.to_string()).unwrap();

    let output = trellis(root, &["lint"]);
    assert!(!output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("error: Found a link cycle between:"));
}

#[test]
fn test_cli_hash_reports() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_workspace(root);

    let output = trellis(root, &["hash", "--write"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let first = stdout_lines(&output);
    assert_eq!(first.len(), 3);

    let cache_dir = root.join(".trellis");
    let report = HashReport::load(&cache_dir, "development", CacheOutputType::Framework)
        .unwrap()
        .unwrap();
    assert_eq!(report.graph, "Workspace");
    assert_eq!(report.hashes.len(), 3);

    std::fs::write(root.join("App/Sources/AppDelegate.swift"), "@main struct App { }").unwrap();
    let output = trellis(root, &["hash", "--write"]);
    assert!(output.status.success());
    let updated = HashReport::load(&cache_dir, "development", CacheOutputType::Framework)
        .unwrap()
        .unwrap();
    let diff = updated.diff(&report);
    assert_eq!(diff.changed, vec![NodeId::new(root.join("App"), "App").to_string()]);
    assert!(diff.added.is_empty() && diff.removed.is_empty());

    let output = trellis(root, &["hash", "--profile", "nightly"]);
    assert!(!output.status.success());

    let output = trellis(root, &["clear"]);
    assert!(output.status.success());
    assert!(!cache_dir.exists());
}

#[test]
fn test_description_to_hashes_pipeline() {
    let dir = TempDir::new().unwrap();
    let graph_file = write_workspace(dir.path());

    let graph = GraphDescription::from_path(&graph_file)
        .unwrap()
        .into_graph()
        .unwrap();
    assert!(GraphLinter::new().lint(&graph).is_empty());

    let pruned = TestTargetsPruner.map(&graph).unwrap();
    let app = NodeId::new(dir.path().join("App"), "App");
    assert!(GraphTraverser::new(&pruned).test_targets_depending_on(&app).is_empty());
    assert_eq!(
        GraphTraverser::new(&graph).test_targets_depending_on(&app).len(),
        1
    );

    let profile = CacheProfile::development();
    let full = ContentHasher::new(graph, Arc::new(DiskSource))
        .content_hashes(&profile, CacheOutputType::Framework)
        .unwrap();
    let without_tests = ContentHasher::new(pruned, Arc::new(DiskSource))
        .content_hashes(&profile, CacheOutputType::Framework)
        .unwrap();
    assert_eq!(full, without_tests);
}

/// Rewrite every absolute path under `root` in the description as relative.
fn relativize(root: &Path, value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(text) => {
            if let Ok(relative) = Path::new(text.as_str()).strip_prefix(root) {
                *text = relative.to_string_lossy().into_owned();
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(|item| relativize(root, item)),
        serde_json::Value::Object(fields) => fields.values_mut().for_each(|field| relativize(root, field)),
        _ => {}
    }
}

#[test]
fn test_cli_relative_description_paths() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let graph_file = write_workspace(root);
    let absolute = stdout_lines(&trellis(root, &["hash"]));

    let mut description: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&graph_file).unwrap()).unwrap();
    relativize(root, &mut description);
    description["root_path"] = json!(".");
    assert_eq!(description["nodes"][0]["path"], json!("App"));
    std::fs::write(&graph_file, description.to_string()).unwrap();

    // Run from somewhere other than the repository root.
    let elsewhere = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_trellis"))
        .current_dir(elsewhere.path())
        .arg("--root")
        .arg(root)
        .arg("hash")
        .output()
        .expect("Failed to execute trellis");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let hashes = |lines: &[String]| -> Vec<String> {
        lines
            .iter()
            .map(|line| line.split_whitespace().next().unwrap().to_string())
            .collect()
    };
    let relative = stdout_lines(&output);
    assert_eq!(relative.len(), 3);
    assert_eq!(hashes(&relative), hashes(&absolute));

    let output = trellis(root, &["deps", "--target", "App", "--path", "App", "--query", "transitive"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_lines(&output).len(), 2);
}
