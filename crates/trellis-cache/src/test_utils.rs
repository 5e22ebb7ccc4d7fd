//! Test utilities for trellis-cache

use std::sync::Arc;

use trellis_graph::*;

use crate::content::MemorySource;
use crate::hasher::ContentHasher;

pub const APP: &str = "/ws/App";
pub const CORE: &str = "/ws/Core";
pub const VENDOR: &str = "/ws/Vendor";

pub fn id(path: &str, name: &str) -> NodeId {
    NodeId::new(path, name)
}

pub fn target(path: &str, name: &str, product: Product, sources: &[&str]) -> Node {
    let mut target = Target::new(product, Platform::Ios);
    target.sources = sources.iter().map(|s| SourceFile::new(*s)).collect();
    Node::target(id(path, name), target)
}

/// App → {Core, Kit}, Core → {Kit, Crash}, AppTests → App.
///
/// Core ships a resource directory and Crash is a precompiled xcframework
/// directory, so both directory paths are exercised.
pub fn workspace_nodes() -> (Vec<Node>, Vec<DependencyEdge>) {
    let mut app = target(APP, "App", Product::App, &["Sources/AppDelegate.swift"]);
    if let NodeKind::Target(target) = &mut app.kind {
        target
            .settings
            .base
            .insert("PRODUCT_BUNDLE_IDENTIFIER".into(), "io.trellis.app".into());
        target
            .settings
            .configurations
            .entry("Debug".into())
            .or_default()
            .insert("SWIFT_OPTIMIZATION_LEVEL".into(), "-Onone".into());
    }

    let mut core = target(CORE, "Core", Product::Framework, &["Sources/Core.swift"]);
    if let NodeKind::Target(target) = &mut core.kind {
        target.resources.push("Resources/Strings".into());
    }

    let nodes = vec![
        app,
        core,
        target(CORE, "Kit", Product::StaticLibrary, &["Sources/Kit.swift"]),
        target(APP, "AppTests", Product::UnitTests, &["Tests/AppTests.swift"]),
        Node {
            id: id(VENDOR, "Crash"),
            kind: NodeKind::PrecompiledBinary {
                binary_path: "Crash.xcframework".into(),
                binary: BinaryKind::XcFramework,
                linking: Linking::Static,
            },
        },
    ];
    let edges = vec![
        DependencyEdge::new(id(APP, "App"), id(CORE, "Core")),
        DependencyEdge::new(id(APP, "App"), id(CORE, "Kit")),
        DependencyEdge::new(id(CORE, "Core"), id(CORE, "Kit")),
        DependencyEdge::new(id(CORE, "Core"), id(VENDOR, "Crash")),
        DependencyEdge::new(id(APP, "AppTests"), id(APP, "App")),
    ];
    (nodes, edges)
}

pub fn workspace() -> Graph {
    let (nodes, edges) = workspace_nodes();
    Graph::build("Workspace", "/ws", vec![Project::new(APP, "App")], nodes, edges).unwrap()
}

pub fn workspace_files() -> MemorySource {
    MemorySource::new()
        .with_file("/ws/App/Sources/AppDelegate.swift", "@main struct App {}")
        .with_file("/ws/App/Tests/AppTests.swift", "final class AppTests {}")
        .with_file("/ws/Core/Sources/Core.swift", "public struct Core {}")
        .with_file("/ws/Core/Sources/Kit.swift", "public struct Kit {}")
        .with_file("/ws/Core/Resources/Strings/en.strings", "\"hi\" = \"Hi\";")
        .with_file("/ws/Core/Resources/Strings/fr.strings", "\"hi\" = \"Salut\";")
        .with_file("/ws/Vendor/Crash.xcframework/Info.plist", "<plist/>")
        .with_file("/ws/Vendor/Crash.xcframework/ios-arm64/Crash.a", vec![0u8, 1, 2, 3])
}

pub fn hasher(graph: &Graph, source: MemorySource) -> ContentHasher {
    ContentHasher::new(graph.clone(), Arc::new(source))
}
