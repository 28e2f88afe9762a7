//! In-memory artifact tier with LRU eviction and an idle TTL.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use lru::LruCache;
use puml_core::{
    duration_millis, ArtifactBytes, ArtifactId, PumlResult, SharedClock, StorageError,
};

use super::config::CacheConfig;
use super::traits::{ArtifactTier, TierStats};

#[derive(Debug)]
struct MemoryEntry {
    bytes: ArtifactBytes,
    /// Epoch millis of the last successful `get` or the `put`.
    last_access: i64,
}

/// Bounded in-memory tier.
///
/// Recency order is maintained by the LRU list itself: every hit moves the
/// entry to the front, and overflow evicts from the back. An entry whose last
/// access is older than the TTL is dropped on the next lookup.
///
/// The internal lock is only held for map operations, never across I/O.
pub struct MemoryCache {
    entries: Mutex<LruCache<ArtifactId, MemoryEntry>>,
    ttl_millis: i64,
    clock: SharedClock,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig, clock: SharedClock) -> Self {
        let capacity = NonZeroUsize::new(config.memory_max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl_millis: duration_millis(config.memory_ttl),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> PumlResult<MutexGuard<'_, LruCache<ArtifactId, MemoryEntry>>> {
        self.entries
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    /// Look up an artifact, refreshing its recency and last-access time.
    pub fn get_entry(&self, id: &ArtifactId) -> PumlResult<Option<ArtifactBytes>> {
        let now = self.clock.now_millis();
        let mut entries = self.lock()?;

        let outcome = entries.get_mut(id).map(|entry| {
            if now.saturating_sub(entry.last_access) > self.ttl_millis {
                None
            } else {
                entry.last_access = now;
                Some(entry.bytes.clone())
            }
        });

        match outcome {
            Some(Some(bytes)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(bytes))
            }
            Some(None) => {
                entries.pop(id);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(artifact_id = %id, "Dropped expired artifact from memory");
                Ok(None)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Insert an artifact, evicting the least-recently-used one at capacity.
    pub fn put_entry(&self, id: &ArtifactId, bytes: ArtifactBytes) -> PumlResult<()> {
        let entry = MemoryEntry {
            bytes,
            last_access: self.clock.now_millis(),
        };
        let displaced = self.lock()?.push(id.clone(), entry);
        self.writes.fetch_add(1, Ordering::Relaxed);

        if let Some((evicted_id, _)) = displaced {
            // `push` also hands back the previous value when the key already existed.
            if evicted_id != *id {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(artifact_id = %evicted_id, "Evicted least-recently-used artifact from memory");
            }
        }
        Ok(())
    }

    pub fn evict_entry(&self, id: &ArtifactId) -> PumlResult<()> {
        if self.lock()?.pop(id).is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    pub fn clear_entries(&self) -> PumlResult<()> {
        self.lock()?.clear();
        Ok(())
    }

    /// Whether an id is present, without touching recency or expiry.
    pub fn contains(&self, id: &ArtifactId) -> PumlResult<bool> {
        Ok(self.lock()?.contains(id))
    }

    pub fn len(&self) -> PumlResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> PumlResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn snapshot(&self) -> PumlResult<TierStats> {
        Ok(TierStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count: self.len()? as u64,
        })
    }
}

#[async_trait]
impl ArtifactTier for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, id: &ArtifactId) -> PumlResult<Option<ArtifactBytes>> {
        self.get_entry(id)
    }

    async fn put(&self, id: &ArtifactId, bytes: ArtifactBytes) -> PumlResult<()> {
        self.put_entry(id, bytes)
    }

    async fn evict(&self, id: &ArtifactId) -> PumlResult<()> {
        self.evict_entry(id)
    }

    async fn clear(&self) -> PumlResult<()> {
        self.clear_entries()
    }

    async fn stats(&self) -> PumlResult<TierStats> {
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use puml_core::{identify, ManualClock, RenderRequest};
    use std::sync::Arc;
    use std::time::Duration;

    fn id(n: usize) -> ArtifactId {
        identify(&RenderRequest::png(format!("@startuml\nA{}->B\n@enduml", n)))
    }

    fn bytes(tag: &str) -> ArtifactBytes {
        Arc::from(tag.as_bytes())
    }

    fn cache(max: usize, ttl_secs: u64) -> (MemoryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let config = CacheConfig::new()
            .with_max_entries(max)
            .with_ttl(Duration::from_secs(ttl_secs));
        (MemoryCache::new(&config, clock.clone()), clock)
    }

    #[test]
    fn test_put_then_get_returns_same_bytes() {
        let (cache, _) = cache(4, 60);
        cache.put_entry(&id(1), bytes("one")).expect("put");
        let got = cache.get_entry(&id(1)).expect("get").expect("hit");
        assert_eq!(&*got, b"one");
        assert_eq!(cache.snapshot().expect("stats").hits, 1);
    }

    #[test]
    fn test_overflow_evicts_least_recently_used() {
        let (cache, clock) = cache(2, 600);
        cache.put_entry(&id(1), bytes("one")).expect("put");
        clock.advance(Duration::from_secs(1));
        cache.put_entry(&id(2), bytes("two")).expect("put");
        clock.advance(Duration::from_secs(1));

        // Touch 1 so that 2 becomes the least recently used.
        assert!(cache.get_entry(&id(1)).expect("get").is_some());
        cache.put_entry(&id(3), bytes("three")).expect("put");

        assert!(cache.contains(&id(1)).expect("contains"));
        assert!(!cache.contains(&id(2)).expect("contains"));
        assert!(cache.contains(&id(3)).expect("contains"));
        assert_eq!(cache.snapshot().expect("stats").evictions, 1);
    }

    #[test]
    fn test_reput_same_id_is_not_an_eviction() {
        let (cache, _) = cache(1, 60);
        cache.put_entry(&id(1), bytes("one")).expect("put");
        cache.put_entry(&id(1), bytes("one")).expect("put");
        let stats = cache.snapshot().expect("stats");
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.entry_count, 1);
    }

    #[test]
    fn test_ttl_is_relative_to_last_access() {
        let (cache, clock) = cache(4, 10);
        cache.put_entry(&id(1), bytes("one")).expect("put");

        clock.advance(Duration::from_secs(8));
        assert!(cache.get_entry(&id(1)).expect("get").is_some());

        // 16s after creation but only 8s after the last access.
        clock.advance(Duration::from_secs(8));
        assert!(cache.get_entry(&id(1)).expect("get").is_some());

        clock.advance(Duration::from_secs(11));
        assert!(cache.get_entry(&id(1)).expect("get").is_none());
        assert!(!cache.contains(&id(1)).expect("contains"));
    }

    #[test]
    fn test_evict_and_clear() {
        let (cache, _) = cache(4, 60);
        cache.put_entry(&id(1), bytes("one")).expect("put");
        cache.put_entry(&id(2), bytes("two")).expect("put");

        cache.evict_entry(&id(1)).expect("evict");
        cache.evict_entry(&id(1)).expect("evict missing is fine");
        assert!(cache.get_entry(&id(1)).expect("get").is_none());

        cache.clear_entries().expect("clear");
        assert!(cache.is_empty().expect("is_empty"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access_is_safe() {
        let (cache, _) = cache(64, 60);
        let cache = Arc::new(cache);

        let mut handles = Vec::new();
        for worker in 0..8usize {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                for n in 0..100usize {
                    let key = id((worker * 100 + n) % 96);
                    cache.put(&key, bytes("payload")).await.expect("put");
                    let _ = cache.get(&key).await.expect("get");
                }
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }

        assert!(cache.len().expect("len") <= 64);
    }
}
