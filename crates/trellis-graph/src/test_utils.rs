//! Test utilities for trellis-graph

use std::path::Path;

use proptest::prelude::*;
use tempfile::TempDir;

use crate::graph::Graph;
use crate::model::*;

pub const APP: &str = "/App";
pub const CORE: &str = "/Core";

pub fn id(path: &str, name: &str) -> NodeId {
    NodeId::new(path, name)
}

/// Fluent builder for small graphs. Targets default to iOS.
#[derive(Default)]
pub struct GraphFixture {
    nodes: Vec<Node>,
    edges: Vec<DependencyEdge>,
    projects: Vec<Project>,
}

impl GraphFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, path: &str, name: &str) -> Self {
        self.projects.push(Project::new(path, name));
        self
    }

    pub fn target(self, path: &str, name: &str, product: Product) -> Self {
        self.target_on(path, name, product, Platform::Ios)
    }

    pub fn target_on(mut self, path: &str, name: &str, product: Product, platform: Platform) -> Self {
        self.nodes
            .push(Node::target(id(path, name), Target::new(product, platform)));
        self
    }

    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn edge(mut self, from: (&str, &str), to: (&str, &str)) -> Self {
        self.edges
            .push(DependencyEdge::new(id(from.0, from.1), id(to.0, to.1)));
        self
    }

    pub fn build(self) -> Graph {
        Graph::build("Fixture", "/", self.projects, self.nodes, self.edges).unwrap()
    }
}

pub fn precompiled(path: &str, name: &str, linking: Linking) -> Node {
    Node {
        id: id(path, name),
        kind: NodeKind::PrecompiledBinary {
            binary_path: Path::new(path).join(format!("{name}.framework")),
            binary: BinaryKind::Framework,
            linking,
        },
    }
}

pub fn package(path: &str, name: &str) -> Node {
    Node {
        id: id(path, name),
        kind: NodeKind::PackageProduct {
            package: format!("https://example.com/{name}.git"),
            product: name.to_string(),
        },
    }
}

pub fn sdk(name: &str) -> Node {
    Node {
        id: id("/sdk", name),
        kind: NodeKind::SystemLibrary {
            status: SdkStatus::Required,
        },
    }
}

/// Sorted node names of a query result.
pub fn names<'g>(nodes: impl IntoIterator<Item = &'g Node>) -> Vec<String> {
    let mut names: Vec<String> = nodes.into_iter().map(|n| n.name().to_string()).collect();
    names.sort();
    names
}

/// Write `json` to a temporary `graph.json`.
pub fn write_description(json: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("graph.json");
    std::fs::write(&path, json).unwrap();
    (dir, path)
}

const PRODUCTS: [Product; 8] = [
    Product::App,
    Product::StaticLibrary,
    Product::StaticFramework,
    Product::Framework,
    Product::DynamicLibrary,
    Product::Bundle,
    Product::UnitTests,
    Product::AppExtension,
];

/// Random graphs of up to 12 targets in one project. Edges are arbitrary
/// pairs, so cycles and self-loops are common.
pub fn arb_graph() -> impl Strategy<Value = Graph> {
    (1usize..12)
        .prop_flat_map(|size| {
            (
                proptest::collection::vec(0..PRODUCTS.len(), size),
                proptest::collection::vec((0..size, 0..size), 0..size * 3),
            )
        })
        .prop_map(|(products, pairs)| {
            let mut fixture = GraphFixture::new().project(APP, "App");
            for (i, product) in products.iter().enumerate() {
                fixture = fixture.target(APP, &format!("T{i}"), PRODUCTS[*product]);
            }
            for (from, to) in pairs {
                fixture = fixture.edge((APP, &format!("T{from}")), (APP, &format!("T{to}")));
            }
            fixture.build()
        })
}
