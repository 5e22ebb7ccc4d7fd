//! `Trellis.toml` loading

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::profile::CacheProfile;

pub const CONFIG_FILE: &str = "Trellis.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown cache profile '{name}' (available: {available})")]
    UnknownProfile { name: String, available: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrellisConfig {
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_profile_name")]
    pub default_profile: String,
    /// Relative to the repository root.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_profiles")]
    pub profiles: Vec<CacheProfile>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_profile: default_profile_name(),
            directory: default_directory(),
            profiles: default_profiles(),
        }
    }
}

fn default_profile_name() -> String {
    "development".to_string()
}

fn default_directory() -> PathBuf {
    PathBuf::from(".trellis")
}

fn default_profiles() -> Vec<CacheProfile> {
    vec![CacheProfile::development(), CacheProfile::release()]
}

impl TrellisConfig {
    /// Load `Trellis.toml` from `root`. A missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(TrellisConfig::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Absolute cache directory for `root`.
    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.cache.directory)
    }
}

impl CacheConfig {
    /// The profile named `name`, or the default profile when `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<&CacheProfile, ConfigError> {
        let name = name.unwrap_or(&self.default_profile);
        self.profiles
            .iter()
            .find(|profile| profile.name == name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: name.to_string(),
                available: self
                    .profiles
                    .iter()
                    .map(|profile| profile.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}
