//! Cache profiles and output types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named cache profile. Its build configuration selects which settings
/// overrides take part in the hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheProfile {
    pub name: String,
    pub configuration: String,
}

impl CacheProfile {
    pub fn new(name: impl Into<String>, configuration: impl Into<String>) -> Self {
        CacheProfile {
            name: name.into(),
            configuration: configuration.into(),
        }
    }

    pub fn development() -> Self {
        CacheProfile::new("development", "Debug")
    }

    pub fn release() -> Self {
        CacheProfile::new("release", "Release")
    }
}

/// The artifact a cached target is stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOutputType {
    Framework,
    XcFramework,
    Bundle,
}

impl CacheOutputType {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheOutputType::Framework => "framework",
            CacheOutputType::XcFramework => "xcframework",
            CacheOutputType::Bundle => "bundle",
        }
    }
}

impl fmt::Display for CacheOutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cache output type '{0}' (expected framework, xcframework or bundle)")]
pub struct UnknownOutputType(pub String);

impl FromStr for CacheOutputType {
    type Err = UnknownOutputType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "framework" => Ok(CacheOutputType::Framework),
            "xcframework" => Ok(CacheOutputType::XcFramework),
            "bundle" => Ok(CacheOutputType::Bundle),
            other => Err(UnknownOutputType(other.to_string())),
        }
    }
}
