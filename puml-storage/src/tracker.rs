//! Last-access bookkeeping for artifacts.
//!
//! The tracker is the authority on which artifacts are still "live". Tier
//! internals (LRU overflow, memory TTL) never consult or modify it, so an id
//! demoted out of memory is still reaped from disk later.

use std::collections::HashSet;

use dashmap::DashMap;
use puml_core::{ArtifactId, SharedClock};

/// Concurrent map from artifact id to the epoch millis of its last access.
#[derive(Debug)]
pub struct AccessTracker {
    last_access: DashMap<ArtifactId, i64>,
    clock: SharedClock,
}

impl AccessTracker {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            last_access: DashMap::new(),
            clock,
        }
    }

    /// Record an access at the current time.
    ///
    /// Timestamps never move backwards for an id, even if the clock does.
    pub fn touch(&self, id: &ArtifactId) -> i64 {
        let now = self.clock.now_millis();
        let mut entry = self.last_access.entry(id.clone()).or_insert(now);
        if *entry < now {
            *entry = now;
        }
        *entry
    }

    /// Ids whose last access is strictly older than `cutoff_millis`.
    ///
    /// Read-only; see [`AccessTracker::remove_stale_before`] for the version
    /// the reaper uses.
    pub fn get_stale_before(&self, cutoff_millis: i64) -> HashSet<ArtifactId> {
        self.last_access
            .iter()
            .filter(|entry| *entry.value() < cutoff_millis)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Remove and return every id whose last access is older than the cutoff.
    ///
    /// Each removal re-checks the timestamp under the shard lock, so an id
    /// touched after the scan started survives and is not returned.
    pub fn remove_stale_before(&self, cutoff_millis: i64) -> HashSet<ArtifactId> {
        self.get_stale_before(cutoff_millis)
            .into_iter()
            .filter(|id| {
                self.last_access
                    .remove_if(id, |_, last| *last < cutoff_millis)
                    .is_some()
            })
            .collect()
    }

    /// Forget an id. Returns whether a record existed.
    pub fn remove(&self, id: &ArtifactId) -> bool {
        self.last_access.remove(id).is_some()
    }

    pub fn clear(&self) {
        self.last_access.clear();
    }

    pub fn last_access(&self, id: &ArtifactId) -> Option<i64> {
        self.last_access.get(id).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.last_access.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_access.is_empty()
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }
}
