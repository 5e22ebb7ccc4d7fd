//! Core data structures for the dependency graph

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Unique, stable identifier for a node: the directory of the project that
/// contains it plus its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub path: PathBuf,
    pub name: String,
}

impl NodeId {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        NodeId {
            path: path.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.name)
    }
}

/// The artifact a target builds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    // ── Runnable ────────────────────────────────────────────
    App,
    AppClip,
    WatchApp,

    // ── Linkable ────────────────────────────────────────────
    StaticLibrary,
    DynamicLibrary,
    Framework,
    StaticFramework,

    // ── Resources ───────────────────────────────────────────
    Bundle,

    // ── Tests ───────────────────────────────────────────────
    UnitTests,
    UiTests,

    // ── Extensions ──────────────────────────────────────────
    AppExtension,
    WatchExtension,
    MessagesExtension,
    StickerPackExtension,
}

impl Product {
    /// Linked into its dependents at build time.
    pub fn is_static(self) -> bool {
        matches!(self, Product::StaticLibrary | Product::StaticFramework)
    }

    /// Linked at load time and embedded next to the host.
    pub fn is_dynamic(self) -> bool {
        matches!(self, Product::DynamicLibrary | Product::Framework)
    }

    pub fn is_tests_bundle(self) -> bool {
        matches!(self, Product::UnitTests | Product::UiTests)
    }

    pub fn is_app_extension(self) -> bool {
        matches!(
            self,
            Product::AppExtension
                | Product::StickerPackExtension
                | Product::WatchExtension
                | Product::MessagesExtension
        )
    }

    pub fn is_app_like(self) -> bool {
        matches!(self, Product::App | Product::AppClip | Product::WatchApp)
    }

    /// Whether the built product has a place to copy resource bundles into.
    pub fn supports_resources(self) -> bool {
        !matches!(
            self,
            Product::StaticLibrary | Product::StaticFramework | Product::DynamicLibrary
        )
    }

    /// Extension of the built product on disk.
    pub fn file_extension(self) -> &'static str {
        match self {
            Product::App | Product::AppClip | Product::WatchApp => "app",
            Product::StaticLibrary => "a",
            Product::DynamicLibrary => "dylib",
            Product::Framework | Product::StaticFramework => "framework",
            Product::Bundle => "bundle",
            Product::UnitTests | Product::UiTests => "xctest",
            Product::AppExtension
            | Product::WatchExtension
            | Product::MessagesExtension
            | Product::StickerPackExtension => "appex",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Product::App => "app",
            Product::AppClip => "app_clip",
            Product::WatchApp => "watch_app",
            Product::StaticLibrary => "static_library",
            Product::DynamicLibrary => "dynamic_library",
            Product::Framework => "framework",
            Product::StaticFramework => "static_framework",
            Product::Bundle => "bundle",
            Product::UnitTests => "unit_tests",
            Product::UiTests => "ui_tests",
            Product::AppExtension => "app_extension",
            Product::WatchExtension => "watch_extension",
            Product::MessagesExtension => "messages_extension",
            Product::StickerPackExtension => "sticker_pack_extension",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported target platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "ios")]
    Ios,
    #[serde(rename = "macos")]
    MacOs,
    #[serde(rename = "tvos")]
    TvOs,
    #[serde(rename = "watchos")]
    WatchOs,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Ios => "iOS",
            Platform::MacOs => "macOS",
            Platform::TvOs => "tvOS",
            Platform::WatchOs => "watchOS",
        };
        f.write_str(name)
    }
}

/// A build setting value: either a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    Array(Vec<String>),
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

pub type SettingsDictionary = BTreeMap<String, SettingValue>;

/// Declared build settings: a base layer plus per-configuration overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub base: SettingsDictionary,
    /// Configuration name (e.g. `Debug`) → settings that override `base`.
    #[serde(default)]
    pub configurations: BTreeMap<String, SettingsDictionary>,
}

impl Settings {
    /// Base settings with the overrides of `configuration` applied. Keys come
    /// back sorted.
    pub fn resolved(&self, configuration: &str) -> SettingsDictionary {
        let mut settings = self.base.clone();
        if let Some(overrides) = self.configurations.get(configuration) {
            for (key, value) in overrides {
                settings.insert(key.clone(), value.clone());
            }
        }
        settings
    }
}

/// A source file compiled by a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Relative to the containing project directory.
    pub path: PathBuf,
    #[serde(default)]
    pub compiler_flags: Option<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SourceFile {
            path: path.into(),
            compiler_flags: None,
        }
    }
}

/// When a build action runs relative to the sources and resources phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOrder {
    Pre,
    Post,
}

/// What a build action executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionScript {
    /// A tool looked up on `PATH` or a script file, with arguments.
    File {
        #[serde(default)]
        tool: Option<String>,
        #[serde(default)]
        path: Option<PathBuf>,
        #[serde(default)]
        arguments: Vec<String>,
    },
    /// An inline shell script.
    Text { script: String },
}

/// A script build phase attached to a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAction {
    pub name: String,
    pub order: ActionOrder,
    pub script: ActionScript,
    #[serde(default)]
    pub input_paths: Vec<PathBuf>,
    #[serde(default)]
    pub output_paths: Vec<PathBuf>,
}

/// A dependency as written in a manifest: a target name, optionally in
/// another project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub name: String,
    /// Containing project path. `None` means the declaring target's project.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DependencyRef {
    /// The identity this reference points at when declared inside `project`.
    pub fn resolve(&self, project: &Path) -> NodeId {
        NodeId::new(
            self.path.clone().unwrap_or_else(|| project.to_path_buf()),
            self.name.clone(),
        )
    }
}

/// A first-party buildable target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub product: Product,
    pub platform: Platform,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceFile>,
    #[serde(default)]
    pub resources: Vec<PathBuf>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub actions: Vec<TargetAction>,
    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
}

impl Target {
    pub fn new(product: Product, platform: Platform) -> Self {
        Target {
            product,
            platform,
            product_name: None,
            sources: Vec::new(),
            resources: Vec::new(),
            settings: Settings::default(),
            actions: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn pre_actions(&self) -> impl Iterator<Item = &TargetAction> {
        self.actions.iter().filter(|a| a.order == ActionOrder::Pre)
    }

    pub fn post_actions(&self) -> impl Iterator<Item = &TargetAction> {
        self.actions.iter().filter(|a| a.order == ActionOrder::Post)
    }
}

/// Packaging of a precompiled binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryKind {
    Framework,
    XcFramework,
    Library,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linking {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdkStatus {
    #[default]
    Required,
    Optional,
}

/// Discriminates what kind of vertex a node is, with its variant payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Target(Target),
    ProjectReference {
        project: PathBuf,
    },
    PrecompiledBinary {
        binary_path: PathBuf,
        binary: BinaryKind,
        linking: Linking,
    },
    PackageProduct {
        package: String,
        product: String,
    },
    SystemLibrary {
        #[serde(default)]
        status: SdkStatus,
    },
}

/// A single vertex in the dependency graph.
///
/// Equality and hashing only look at [`NodeId`]; two nodes with the same
/// identity are the same node regardless of payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Node {
    pub fn target(id: NodeId, target: Target) -> Self {
        Node {
            id,
            kind: NodeKind::Target(target),
        }
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn path(&self) -> &Path {
        &self.id.path
    }

    pub fn as_target(&self) -> Option<&Target> {
        match &self.kind {
            NodeKind::Target(target) => Some(target),
            _ => None,
        }
    }

    pub fn product(&self) -> Option<Product> {
        self.as_target().map(|t| t.product)
    }

    pub fn platform(&self) -> Option<Platform> {
        self.as_target().map(|t| t.platform)
    }

    pub fn is_tests_bundle(&self) -> bool {
        self.product().is_some_and(Product::is_tests_bundle)
    }

    pub fn supports_resources(&self) -> bool {
        self.product().is_some_and(Product::supports_resources)
    }

    /// Static library, static framework or a statically linked binary.
    pub fn is_static_linkable(&self) -> bool {
        match &self.kind {
            NodeKind::Target(target) => target.product.is_static(),
            NodeKind::PrecompiledBinary { linking, .. } => *linking == Linking::Static,
            _ => false,
        }
    }

    pub fn is_dynamic_linkable(&self) -> bool {
        match &self.kind {
            NodeKind::Target(target) => target.product.is_dynamic(),
            NodeKind::PrecompiledBinary { linking, .. } => *linking == Linking::Dynamic,
            NodeKind::SystemLibrary { .. } => true,
            _ => false,
        }
    }

    /// The file name the build tool sees when linking or embedding this node.
    pub fn product_name_with_extension(&self) -> String {
        match &self.kind {
            NodeKind::Target(target) => {
                let stem = target.product_name.as_deref().unwrap_or(&self.id.name);
                format!("{}.{}", stem, target.product.file_extension())
            }
            NodeKind::PrecompiledBinary { binary_path, .. } => binary_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.id.name.clone()),
            NodeKind::PackageProduct { product, .. } => product.clone(),
            NodeKind::ProjectReference { .. } | NodeKind::SystemLibrary { .. } => {
                self.id.name.clone()
            }
        }
    }
}

/// A directed edge `from → to`: `from` depends on `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: NodeId,
    pub to: NodeId,
}

impl DependencyEdge {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        DependencyEdge { from, to }
    }
}

/// What relationship an edge represents. Never stored; inferred from the
/// nodes at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    // ── Linking ─────────────────────────────────────────────
    StaticLink,
    DynamicLink,
    Package,

    // ── Embedding ───────────────────────────────────────────
    ResourceBundle,
    ExtensionEmbed,
    TestHost,

    // ── Fallback ────────────────────────────────────────────
    Reference,
}

impl DependencyKind {
    /// Infer the kind of the edge `from → to`.
    pub fn infer(from: &Node, to: &Node) -> Self {
        match &to.kind {
            NodeKind::PackageProduct { .. } => DependencyKind::Package,
            NodeKind::SystemLibrary { .. } => DependencyKind::DynamicLink,
            NodeKind::ProjectReference { .. } => DependencyKind::Reference,
            NodeKind::PrecompiledBinary { linking, .. } => match linking {
                Linking::Static => DependencyKind::StaticLink,
                Linking::Dynamic => DependencyKind::DynamicLink,
            },
            NodeKind::Target(target) => {
                let product = target.product;
                if from.is_tests_bundle() && product.is_app_like() {
                    DependencyKind::TestHost
                } else if product == Product::Bundle {
                    DependencyKind::ResourceBundle
                } else if product.is_static() {
                    DependencyKind::StaticLink
                } else if product.is_dynamic() {
                    DependencyKind::DynamicLink
                } else if product.is_app_extension()
                    || matches!(product, Product::AppClip | Product::WatchApp)
                {
                    DependencyKind::ExtensionEmbed
                } else {
                    DependencyKind::Reference
                }
            }
        }
    }

    /// Part of the static/dynamic link sub-relation that must stay acyclic.
    pub fn is_link(self) -> bool {
        matches!(self, DependencyKind::StaticLink | DependencyKind::DynamicLink)
    }
}

/// A project that is an entry point of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Project {
    pub path: PathBuf,
    pub name: String,
}

impl Project {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Project {
            path: path.into(),
            name: name.into(),
        }
    }
}
