//! Cache tier configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Name of the scratch subdirectory created under the host temp directory.
pub const SCRATCH_SUBDIR: &str = "plantuml-images";

/// Default maximum number of artifacts held in memory.
pub const DEFAULT_MEMORY_MAX_ENTRIES: usize = 10_000;

/// Default idle TTL for in-memory artifacts (1 hour).
pub const DEFAULT_MEMORY_TTL_SECS: u64 = 3600;

/// Configuration for the memory and disk tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of artifacts held in memory.
    pub memory_max_entries: usize,
    /// Entries not accessed for longer than this are dropped from memory.
    pub memory_ttl: Duration,
    /// Directory holding on-disk artifacts for the lifetime of the process.
    pub scratch_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_max_entries: DEFAULT_MEMORY_MAX_ENTRIES,
            memory_ttl: Duration::from_secs(DEFAULT_MEMORY_TTL_SECS),
            scratch_dir: default_scratch_dir(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of in-memory entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.memory_max_entries = max;
        self
    }

    /// Set the in-memory idle TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.memory_ttl = ttl;
        self
    }

    /// Set the scratch directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }
}

/// `<host temp dir>/plantuml-images`.
pub fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join(SCRATCH_SUBDIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.memory_max_entries, 10_000);
        assert_eq!(config.memory_ttl, Duration::from_secs(3600));
        assert!(config.scratch_dir.ends_with(SCRATCH_SUBDIR));
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new()
            .with_max_entries(5)
            .with_ttl(Duration::from_secs(10))
            .with_scratch_dir("/var/tmp/puml");

        assert_eq!(config.memory_max_entries, 5);
        assert_eq!(config.memory_ttl, Duration::from_secs(10));
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp/puml"));
    }
}
