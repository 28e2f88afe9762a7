//! PUML Storage - Artifact Tiers and Access Tracking
//!
//! Two cache tiers share one keyspace of [`ArtifactId`](puml_core::ArtifactId)s:
//! a bounded in-memory LRU with an idle TTL, and a scratch-directory disk
//! store. The [`AccessTracker`] records last access per id independently of
//! either tier and is the only source of reaping candidates.

pub mod cache;
pub mod tracker;

pub use cache::{ArtifactTier, CacheConfig, DiskStore, MemoryCache, TierStats};
pub use tracker::AccessTracker;
