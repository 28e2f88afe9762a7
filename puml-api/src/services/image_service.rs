//! Image Service
//!
//! Read-through orchestration over the artifact tiers: memory first, then
//! disk (promoting hits into memory), then the rendering engine (populating
//! disk and memory). Every successful lookup refreshes the access record that
//! the reaper uses to find stale artifacts.
//!
//! Renders are single-flight per artifact id. The first request for a
//! missing id becomes the leader and runs the engine; concurrent requests for
//! the same id wait on the leader's cell and receive its result, success or
//! failure. Requests for different ids never wait on each other.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use puml_core::{
    identify, ArtifactBytes, ArtifactId, PumlError, PumlResult, RenderError, RenderGateway,
    RenderRequest, SharedClock,
};
use puml_storage::{AccessTracker, ArtifactTier, DiskStore, MemoryCache};
use tokio::sync::OnceCell;

use crate::config::ServiceConfig;
use crate::telemetry::metrics;

/// One in-flight render and the number of requests attached to it.
#[derive(Debug, Default)]
struct Flight {
    outcome: OnceCell<Result<Rendered, RenderError>>,
    // Only changed while the inflight shard lock is held.
    attached: AtomicUsize,
}

type SharedFlight = Arc<Flight>;

/// Detaches a request from its flight when dropped, on completion or on
/// cancellation. The flight leaves the map once it has an outcome or once
/// its last attached request is gone.
struct FlightGuard<'a> {
    inflight: &'a DashMap<ArtifactId, SharedFlight>,
    id: &'a ArtifactId,
    flight: SharedFlight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.inflight.remove_if(self.id, |_, current| {
            Arc::ptr_eq(current, &self.flight)
                && (current.outcome.initialized()
                    || current.attached.fetch_sub(1, Ordering::AcqRel) == 1)
        });
    }
}

/// Where a lookup found its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Memory,
    Disk,
}

/// Result of a flight: bytes the flight rendered, or bytes its re-probe
/// found already stored.
#[derive(Debug, Clone)]
enum Rendered {
    Fresh(ArtifactBytes),
    Found(ArtifactBytes),
}

// ============================================================================
// STATISTICS
// ============================================================================

#[derive(Debug, Default)]
struct ServiceCounters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    renders: AtomicU64,
    render_failures: AtomicU64,
    coalesced: AtomicU64,
}

/// Point-in-time copy of the service counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageServiceStats {
    /// Requests answered from memory
    pub memory_hits: u64,
    /// Requests answered from disk (and promoted)
    pub disk_hits: u64,
    /// Engine invocations
    pub renders: u64,
    /// Engine invocations that failed or timed out
    pub render_failures: u64,
    /// Requests served by another request's render, including leaders whose
    /// re-probe found a just-finished render
    pub coalesced: u64,
}

// ============================================================================
// SERVICE
// ============================================================================

/// The render-cache orchestrator.
pub struct ImageService {
    memory: Arc<dyn ArtifactTier>,
    disk: Arc<dyn ArtifactTier>,
    tracker: Arc<AccessTracker>,
    renderer: Arc<dyn RenderGateway>,
    render_timeout: Duration,
    inflight: DashMap<ArtifactId, SharedFlight>,
    counters: ServiceCounters,
}

impl ImageService {
    pub fn new(
        memory: Arc<dyn ArtifactTier>,
        disk: Arc<dyn ArtifactTier>,
        tracker: Arc<AccessTracker>,
        renderer: Arc<dyn RenderGateway>,
        render_timeout: Duration,
    ) -> Self {
        Self {
            memory,
            disk,
            tracker,
            renderer,
            render_timeout,
            inflight: DashMap::new(),
            counters: ServiceCounters::default(),
        }
    }

    /// Build the production tiers from configuration.
    ///
    /// Creates the scratch directory; fails if it cannot be created.
    pub fn from_config(
        config: &ServiceConfig,
        clock: SharedClock,
        renderer: Arc<dyn RenderGateway>,
    ) -> PumlResult<Self> {
        let memory = Arc::new(MemoryCache::new(&config.cache, clock.clone()));
        let disk = Arc::new(DiskStore::open(&config.cache.scratch_dir)?);
        let tracker = Arc::new(AccessTracker::new(clock));
        Ok(Self::new(
            memory,
            disk,
            tracker,
            renderer,
            config.render.timeout,
        ))
    }

    pub fn tracker(&self) -> &Arc<AccessTracker> {
        &self.tracker
    }

    pub fn memory(&self) -> &Arc<dyn ArtifactTier> {
        &self.memory
    }

    pub fn disk(&self) -> &Arc<dyn ArtifactTier> {
        &self.disk
    }

    /// Number of renders currently in flight.
    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    pub fn stats(&self) -> ImageServiceStats {
        ImageServiceStats {
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.counters.disk_hits.load(Ordering::Relaxed),
            renders: self.counters.renders.load(Ordering::Relaxed),
            render_failures: self.counters.render_failures.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
        }
    }

    /// Return the image for a request, rendering it at most once per id.
    ///
    /// Render failures are returned as [`PumlError::Render`] and leave no
    /// trace in either tier or the tracker.
    pub async fn render(&self, request: &RenderRequest) -> PumlResult<ArtifactBytes> {
        let id = identify(request);

        if let Some((bytes, tier)) = self.lookup(&id).await {
            self.record_hit(&id, tier);
            self.tracker.touch(&id);
            return Ok(bytes);
        }

        let flight = {
            let entry = self
                .inflight
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Flight::default()));
            entry.attached.fetch_add(1, Ordering::AcqRel);
            Arc::clone(entry.value())
        };
        let guard = FlightGuard {
            inflight: &self.inflight,
            id: &id,
            flight: Arc::clone(&flight),
        };

        let mut rendered = false;
        let outcome = flight
            .outcome
            .get_or_init(|| {
                rendered = true;
                self.render_and_store(&id, request)
            })
            .await
            .clone();
        drop(guard);

        if !rendered || matches!(outcome, Ok(Rendered::Found(_))) {
            self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
            record_lookup("coalesced");
            tracing::debug!(artifact_id = %id, "Served by another render");
        }

        let bytes = match outcome {
            Ok(Rendered::Fresh(bytes) | Rendered::Found(bytes)) => bytes,
            Err(e) => return Err(PumlError::from(e)),
        };
        self.tracker.touch(&id);
        Ok(bytes)
    }

    fn record_hit(&self, id: &ArtifactId, tier: Tier) {
        match tier {
            Tier::Memory => {
                self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
                record_lookup("memory");
                tracing::debug!(artifact_id = %id, "Memory hit");
            }
            Tier::Disk => {
                self.counters.disk_hits.fetch_add(1, Ordering::Relaxed);
                record_lookup("disk");
                tracing::debug!(artifact_id = %id, "Disk hit");
            }
        }
    }

    /// Probe memory, then disk, promoting disk hits. Tier failures count as
    /// misses. Counting is left to the caller.
    async fn lookup(&self, id: &ArtifactId) -> Option<(ArtifactBytes, Tier)> {
        match self.memory.get(id).await {
            Ok(Some(bytes)) => return Some((bytes, Tier::Memory)),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(tier = self.memory.name(), artifact_id = %id, error = %e, "Tier lookup failed, treating as miss");
            }
        }

        match self.disk.get(id).await {
            Ok(Some(bytes)) => {
                if let Err(e) = self.memory.put(id, bytes.clone()).await {
                    tracing::warn!(artifact_id = %id, error = %e, "Failed to promote artifact into memory");
                }
                Some((bytes, Tier::Disk))
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(tier = self.disk.name(), artifact_id = %id, error = %e, "Tier lookup failed, treating as miss");
                None
            }
        }
    }

    /// Leader path: re-probe, render, populate disk then memory.
    async fn render_and_store(
        &self,
        id: &ArtifactId,
        request: &RenderRequest,
    ) -> Result<Rendered, RenderError> {
        // A previous flight may have finished between our lookup and
        // attaching to this one.
        if let Some((bytes, _)) = self.lookup(id).await {
            return Ok(Rendered::Found(bytes));
        }
        record_lookup("miss");

        let format = request.output_format;
        let started = Instant::now();
        let outcome = match tokio::time::timeout(
            self.render_timeout,
            self.renderer.render(&request.source_text, format),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout {
                after_ms: u64::try_from(self.render_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        let elapsed = started.elapsed();

        self.counters.renders.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = metrics() {
            metrics.record_render(format.as_str(), outcome.is_ok(), elapsed.as_secs_f64());
        }

        let bytes = match outcome {
            Ok(bytes) => bytes,
            Err(e) => {
                self.counters.render_failures.fetch_add(1, Ordering::Relaxed);
                tracing::info!(artifact_id = %id, engine = self.renderer.name(), error = %e, "Render failed");
                return Err(e);
            }
        };

        tracing::debug!(
            artifact_id = %id,
            output_format = %format,
            size = bytes.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Rendered artifact"
        );

        if let Err(e) = self.disk.put(id, bytes.clone()).await {
            tracing::warn!(artifact_id = %id, error = %e, "Failed to write artifact to disk");
        }
        if let Err(e) = self.memory.put(id, bytes.clone()).await {
            tracing::warn!(artifact_id = %id, error = %e, "Failed to write artifact to memory");
        }

        Ok(Rendered::Fresh(bytes))
    }

    /// Evict an id from both tiers, leaving its access record alone.
    ///
    /// Both tiers are attempted even if the first fails; the first error is
    /// returned.
    pub async fn evict_tiers(&self, id: &ArtifactId) -> PumlResult<()> {
        let memory = self.memory.evict(id).await;
        let disk = self.disk.evict(id).await;
        memory.and(disk)
    }

    /// Forget an id's access record, then evict it from both tiers.
    ///
    /// A render for the same id that lands during the eviction touches a
    /// fresh record, so whatever it stores stays reapable. Idempotent;
    /// storage failures are logged, never returned.
    pub async fn remove_artifact(&self, id: &ArtifactId) {
        self.tracker.remove(id);
        if let Err(e) = self.evict_tiers(id).await {
            tracing::warn!(artifact_id = %id, error = %e, "Failed to evict artifact");
        }
    }

    /// Clear both tiers and every access record.
    ///
    /// Every step runs even if an earlier one fails; the first error is
    /// returned.
    pub async fn remove_all(&self) -> PumlResult<()> {
        let memory = self.memory.clear().await;
        let disk = self.disk.clear().await;
        let forgotten = self.tracker.len();
        self.tracker.clear();

        match (&memory, &disk) {
            (Ok(()), Ok(())) => {
                tracing::info!(forgotten, "Cleared all cached artifacts");
            }
            _ => {
                tracing::warn!(
                    memory = ?memory.as_ref().err(),
                    disk = ?disk.as_ref().err(),
                    "Clearing cached artifacts was incomplete"
                );
            }
        }
        memory.and(disk)
    }
}

impl std::fmt::Debug for ImageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageService")
            .field("memory", &self.memory.name())
            .field("disk", &self.disk.name())
            .field("renderer", &self.renderer.name())
            .field("render_timeout", &self.render_timeout)
            .field("inflight", &self.inflight.len())
            .finish()
    }
}

fn record_lookup(outcome: &str) {
    if let Some(metrics) = metrics() {
        metrics.record_lookup(outcome);
    }
}
