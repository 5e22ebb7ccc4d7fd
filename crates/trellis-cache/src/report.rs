//! Hash reports persisted between runs

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trellis_graph::NodeId;

use crate::hasher::ContentHash;
use crate::profile::{CacheOutputType, CacheProfile};

/// Subdirectory of the cache directory holding reports.
pub const HASHES_DIR: &str = "hashes";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed hash report {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The content hashes of one run, keyed by `NodeId` display form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashReport {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub graph: String,
    pub profile: String,
    pub output: CacheOutputType,
    pub hashes: BTreeMap<String, ContentHash>,
}

/// Targets whose hash appeared, disappeared or changed between two reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HashDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl HashDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl HashReport {
    pub fn new(
        graph: impl Into<String>,
        profile: &CacheProfile,
        output: CacheOutputType,
        hashes: &HashMap<NodeId, ContentHash>,
    ) -> Self {
        HashReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            graph: graph.into(),
            profile: profile.name.clone(),
            output,
            hashes: hashes
                .iter()
                .map(|(id, hash)| (id.to_string(), *hash))
                .collect(),
        }
    }

    /// `<cache_dir>/hashes/<profile>-<output>.json`
    pub fn path(cache_dir: &Path, profile: &str, output: CacheOutputType) -> PathBuf {
        cache_dir
            .join(HASHES_DIR)
            .join(format!("{profile}-{output}.json"))
    }

    /// Write the report as pretty JSON, replacing any previous one.
    pub fn save(&self, cache_dir: &Path) -> Result<PathBuf, ReportError> {
        let path = Self::path(cache_dir, &self.profile, self.output);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| ReportError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), hashes = self.hashes.len(), "hash report saved");
        Ok(path)
    }

    /// The previous report for `profile` and `output`, if one was saved.
    pub fn load(
        cache_dir: &Path,
        profile: &str,
        output: CacheOutputType,
    ) -> Result<Option<Self>, ReportError> {
        let path = Self::path(cache_dir, profile, output);
        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&path).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        let report = serde_json::from_str(&json).map_err(|source| ReportError::Json {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "hash report loaded");
        Ok(Some(report))
    }

    /// What changed going from `previous` to `self`. Lists are sorted.
    pub fn diff(&self, previous: &HashReport) -> HashDiff {
        let mut diff = HashDiff::default();
        for (target, hash) in &self.hashes {
            match previous.hashes.get(target) {
                None => diff.added.push(target.clone()),
                Some(old) if old != hash => diff.changed.push(target.clone()),
                Some(_) => {}
            }
        }
        diff.removed = previous
            .hashes
            .keys()
            .filter(|target| !self.hashes.contains_key(*target))
            .cloned()
            .collect();
        diff
    }
}

/// Remove the cache directory. Returns whether anything was removed.
pub fn clear_cache(cache_dir: &Path) -> Result<bool, ReportError> {
    if !cache_dir.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(cache_dir).map_err(|source| ReportError::Io {
        path: cache_dir.to_path_buf(),
        source,
    })?;
    Ok(true)
}
