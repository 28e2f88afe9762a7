//! Artifact tier trait and statistics.

use async_trait::async_trait;
use puml_core::{ArtifactBytes, ArtifactId, PumlResult};

/// A storage tier holding rendered artifacts keyed by [`ArtifactId`].
///
/// Implementations must be safe under concurrent calls from many request
/// handlers. Bytes stored for an id are never mutated; a second `put` for the
/// same id carries identical content.
#[async_trait]
pub trait ArtifactTier: Send + Sync {
    /// Short tier name used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Look up an artifact. `Ok(None)` is a miss.
    async fn get(&self, id: &ArtifactId) -> PumlResult<Option<ArtifactBytes>>;

    /// Store an artifact.
    async fn put(&self, id: &ArtifactId, bytes: ArtifactBytes) -> PumlResult<()>;

    /// Remove an artifact. Removing an absent id succeeds.
    async fn evict(&self, id: &ArtifactId) -> PumlResult<()>;

    /// Remove every artifact held by this tier.
    async fn clear(&self) -> PumlResult<()>;

    /// Current counters for this tier.
    async fn stats(&self) -> PumlResult<TierStats>;
}

/// Statistics about tier usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierStats {
    /// Number of lookups that found an artifact.
    pub hits: u64,
    /// Number of lookups that found nothing (including expired entries).
    pub misses: u64,
    /// Number of artifacts written.
    pub writes: u64,
    /// Number of artifacts removed by capacity, expiry or explicit eviction.
    pub evictions: u64,
    /// Number of artifacts currently held.
    pub entry_count: u64,
}

impl TierStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
