//! Trellis Cache — content hashing of graph targets and hash reports

pub mod config;
pub mod content;
pub mod hasher;
pub mod profile;
pub mod report;


#[cfg(test)]
pub mod test_utils;

pub use config::{CONFIG_FILE, CacheConfig, ConfigError, TrellisConfig};
pub use content::{Cancellation, ContentSource, DiskSource, MemorySource};
pub use hasher::{ContentHash, ContentHasher, HashError};
pub use profile::{CacheOutputType, CacheProfile, UnknownOutputType};
pub use report::{HashDiff, HashReport, ReportError, clear_cache};
