//! Artifact cache tiers.
//!
//! Both tiers implement [`ArtifactTier`], so the orchestrator probes them
//! through one interface and tests can swap in failing tiers.
//!
//! # Tiers
//!
//! - [`MemoryCache`]: bounded by entry count, evicts the least-recently-used
//!   entry on overflow, and treats entries idle for longer than the TTL as
//!   absent.
//! - [`DiskStore`]: one file per artifact under a process-owned scratch
//!   directory. Writes go through a temporary file and a rename, so readers
//!   never observe a partial artifact.
//!
//! # Example
//!
//! ```ignore
//! let memory = MemoryCache::new(&CacheConfig::default(), SystemClock::shared());
//! let disk = DiskStore::open(CacheConfig::default().scratch_dir)?;
//!
//! if let Some(bytes) = memory.get(&id).await? {
//!     return Ok(bytes);
//! }
//! ```

pub mod config;
pub mod disk;
pub mod memory;
pub mod traits;

pub use config::CacheConfig;
pub use disk::DiskStore;
pub use memory::MemoryCache;
pub use traits::{ArtifactTier, TierStats};
