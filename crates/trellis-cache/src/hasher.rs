//! Content hashing of graph nodes.
//!
//! The hash of a node covers its own inputs (its *fingerprint*) and the
//! fingerprints of every cache-relevant node it transitively depends on,
//! combined in `NodeId` order. Combining flat fingerprints rather than
//! recursing on dependency hashes keeps the computation well defined on
//! cyclic input.
//!
//! Node paths enter a fingerprint relative to the graph root, so the same
//! workspace checked out in two places hashes the same.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use trellis_graph::traverser::{GraphTraverser, sorted};
use trellis_graph::*;

use crate::content::{Cancellation, ContentSource};
use crate::profile::{CacheOutputType, CacheProfile};

// ---------------------------------------------------------------------------
// Hash newtype
// ---------------------------------------------------------------------------

/// 32-byte BLAKE3 digest identifying a node's build inputs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<blake3::Hash> for ContentHash {
    fn from(hash: blake3::Hash) -> Self {
        ContentHash(*hash.as_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(blake3::Hash::from(self.0).to_hex().as_str())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_string()[..16])
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        blake3::Hash::from_hex(hex)
            .map(ContentHash::from)
            .map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("cannot read {path} for {node}: {source}")]
    UnreadableSource {
        node: NodeId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("hashing was cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Hasher
// ---------------------------------------------------------------------------

type MemoKey = (NodeId, String, CacheOutputType);

/// Computes content hashes of the nodes of one graph.
///
/// Results are memoized per `(node, profile, output type)`. The memo is only
/// valid for the graph the hasher was built with; a derived graph needs a
/// new hasher. An entry is only inserted once fully computed, so a failed or
/// cancelled run leaves nothing half-written behind. Safe to share across
/// threads.
pub struct ContentHasher {
    graph: Graph,
    source: Arc<dyn ContentSource>,
    cancellation: Cancellation,
    fingerprints: DashMap<MemoKey, ContentHash>,
    hashes: DashMap<MemoKey, ContentHash>,
}

impl ContentHasher {
    pub fn new(graph: Graph, source: Arc<dyn ContentSource>) -> Self {
        ContentHasher {
            graph,
            source,
            cancellation: Cancellation::new(),
            fingerprints: DashMap::new(),
            hashes: DashMap::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Number of memoized node hashes.
    pub fn memoized(&self) -> usize {
        self.hashes.len()
    }

    /// Hash `node` and its transitive cache-relevant dependencies.
    #[tracing::instrument(skip_all, fields(node = %node.id, profile = %profile.name, output = %output))]
    pub fn hash(
        &self,
        node: &Node,
        profile: &CacheProfile,
        output: CacheOutputType,
    ) -> Result<ContentHash, HashError> {
        let key = (node.id.clone(), profile.name.clone(), output);
        if let Some(hash) = self.hashes.get(&key) {
            return Ok(*hash);
        }

        let traverser = GraphTraverser::new(&self.graph);
        let dependencies = sorted(
            traverser
                .transitive_closure(&node.id)
                .into_iter()
                .filter(|dependency| is_cache_relevant(dependency)),
        );

        let mut hasher = blake3::Hasher::new();
        hasher.update(self.fingerprint(node, profile, output)?.as_bytes());
        for dependency in dependencies {
            let fingerprint = self.fingerprint(dependency, profile, output)?;
            hasher.update(fingerprint.as_bytes());
        }
        let hash = ContentHash::from(hasher.finalize());

        tracing::trace!(%hash, "hashed");
        self.hashes.insert(key, hash);
        Ok(hash)
    }

    /// Hash every cacheable target of the graph in parallel. Test bundles are
    /// never cached.
    #[tracing::instrument(skip_all, fields(graph = %self.graph.name(), profile = %profile.name, output = %output))]
    pub fn content_hashes(
        &self,
        profile: &CacheProfile,
        output: CacheOutputType,
    ) -> Result<HashMap<NodeId, ContentHash>, HashError> {
        let cacheable: Vec<&Node> = self
            .graph
            .targets()
            .map(|(node, _)| node)
            .filter(|node| !node.is_tests_bundle())
            .collect();

        let hashes: HashMap<NodeId, ContentHash> = cacheable
            .par_iter()
            .map(|node| {
                self.hash(node, profile, output)
                    .map(|hash| (node.id.clone(), hash))
            })
            .collect::<Result<_, _>>()?;

        tracing::debug!(targets = hashes.len(), "content hashes computed");
        Ok(hashes)
    }

    /// The hash of everything `node` itself contributes.
    fn fingerprint(
        &self,
        node: &Node,
        profile: &CacheProfile,
        output: CacheOutputType,
    ) -> Result<ContentHash, HashError> {
        let key = (node.id.clone(), profile.name.clone(), output);
        if let Some(fingerprint) = self.fingerprints.get(&key) {
            return Ok(*fingerprint);
        }

        let mut fp = Fingerprint::new();
        self.node_id(&mut fp, &node.id);

        match &node.kind {
            NodeKind::Target(target) => {
                fp.field(b"target");
                self.fingerprint_target(&mut fp, node, target, profile)?;
            }
            NodeKind::ProjectReference { project } => {
                fp.field(b"project_reference");
                fp.field(self.relative(project).as_os_str().as_encoded_bytes());
            }
            NodeKind::PrecompiledBinary {
                binary_path,
                binary,
                linking,
            } => {
                fp.field(b"precompiled_binary");
                fp.field(format!("{binary:?}:{linking:?}").as_bytes());
                self.hash_path(&mut fp, node, &node.id.path.join(binary_path))?;
            }
            NodeKind::PackageProduct { package, product } => {
                fp.field(b"package_product");
                fp.field(package.as_bytes());
                fp.field(product.as_bytes());
            }
            NodeKind::SystemLibrary { status } => {
                fp.field(b"system_library");
                fp.field(format!("{status:?}").as_bytes());
            }
        }

        let mut dependencies: Vec<&NodeId> = self.graph.store().edges(&node.id).iter().collect();
        dependencies.sort();
        fp.field(&(dependencies.len() as u64).to_le_bytes());
        for dependency in dependencies {
            self.node_id(&mut fp, dependency);
        }

        fp.field(output.as_str().as_bytes());
        fp.field(profile.name.as_bytes());
        fp.field(profile.configuration.as_bytes());

        let fingerprint = fp.finish();
        self.fingerprints.insert(key, fingerprint);
        Ok(fingerprint)
    }

    fn node_id(&self, fp: &mut Fingerprint, id: &NodeId) {
        fp.field(self.relative(&id.path).as_os_str().as_encoded_bytes());
        fp.field(id.name.as_bytes());
    }

    /// `path` relative to the graph root, or unchanged when outside it.
    fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(self.graph.root_path()).unwrap_or(path)
    }

    fn fingerprint_target(
        &self,
        fp: &mut Fingerprint,
        node: &Node,
        target: &Target,
        profile: &CacheProfile,
    ) -> Result<(), HashError> {
        fp.field(target.product.as_str().as_bytes());
        fp.field(target.platform.to_string().as_bytes());
        fp.field(target.product_name.as_deref().unwrap_or_default().as_bytes());

        let mut sources: Vec<&SourceFile> = target.sources.iter().collect();
        sources.sort_by(|a, b| a.path.cmp(&b.path));
        fp.field(&(sources.len() as u64).to_le_bytes());
        for source in sources {
            let contents = self.read(node, &node.id.path.join(&source.path))?;
            fp.field(source.path.as_os_str().as_encoded_bytes());
            fp.field(blake3::hash(&contents).as_bytes());
            fp.field(source.compiler_flags.as_deref().unwrap_or_default().as_bytes());
        }

        let mut resources: Vec<&PathBuf> = target.resources.iter().collect();
        resources.sort();
        fp.field(&(resources.len() as u64).to_le_bytes());
        for resource in resources {
            fp.field(resource.as_os_str().as_encoded_bytes());
            self.hash_path(fp, node, &node.id.path.join(resource))?;
        }

        let settings = target.settings.resolved(&profile.configuration);
        fp.field(&(settings.len() as u64).to_le_bytes());
        for (key, value) in &settings {
            fp.field(key.as_bytes());
            match value {
                SettingValue::String(value) => fp.field(value.as_bytes()),
                SettingValue::Array(values) => {
                    fp.field(&(values.len() as u64).to_le_bytes());
                    for value in values {
                        fp.field(value.as_bytes());
                    }
                }
            }
        }

        // Declaration order is significant for actions.
        fp.field(&(target.actions.len() as u64).to_le_bytes());
        for action in &target.actions {
            fp.field(action.name.as_bytes());
            fp.field(format!("{:?}", action.order).as_bytes());
            match &action.script {
                ActionScript::File {
                    tool,
                    path,
                    arguments,
                } => {
                    fp.field(tool.as_deref().unwrap_or_default().as_bytes());
                    fp.field(
                        path.as_deref()
                            .map(|path| path.as_os_str().as_encoded_bytes())
                            .unwrap_or_default(),
                    );
                    fp.field(arguments.join("\0").as_bytes());
                }
                ActionScript::Text { script } => fp.field(script.as_bytes()),
            }
            for path in action.input_paths.iter().chain(&action.output_paths) {
                fp.field(path.as_os_str().as_encoded_bytes());
            }
        }

        Ok(())
    }

    /// Feed a file, or every file below a directory in sorted order.
    fn hash_path(&self, fp: &mut Fingerprint, node: &Node, path: &Path) -> Result<(), HashError> {
        let listed = self.source.list_files(path).map_err(|source| HashError::UnreadableSource {
            node: node.id.clone(),
            path: path.to_path_buf(),
            source,
        })?;

        match listed {
            None => {
                let contents = self.read(node, path)?;
                fp.field(blake3::hash(&contents).as_bytes());
            }
            Some(files) => {
                fp.field(&(files.len() as u64).to_le_bytes());
                for file in files {
                    let contents = self.read(node, &file)?;
                    let relative = file.strip_prefix(path).unwrap_or(&file);
                    fp.field(relative.as_os_str().as_encoded_bytes());
                    fp.field(blake3::hash(&contents).as_bytes());
                }
            }
        }
        Ok(())
    }

    fn read(&self, node: &Node, path: &Path) -> Result<Vec<u8>, HashError> {
        if self.cancellation.is_cancelled() {
            return Err(HashError::Cancelled);
        }
        self.source.read(path).map_err(|source| HashError::UnreadableSource {
            node: node.id.clone(),
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Test bundles and project references never contribute to a cache key.
fn is_cache_relevant(node: &Node) -> bool {
    !node.is_tests_bundle() && !matches!(node.kind, NodeKind::ProjectReference { .. })
}

/// Length-prefixed field writer, so adjacent fields can never run together.
struct Fingerprint(blake3::Hasher);

impl Fingerprint {
    fn new() -> Self {
        Fingerprint(blake3::Hasher::new())
    }

    fn field(&mut self, bytes: &[u8]) {
        self.0.update(&(bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
    }

    fn finish(self) -> ContentHash {
        ContentHash::from(self.0.finalize())
    }
}
