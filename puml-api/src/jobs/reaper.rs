//! Stale Artifact Reaper
//!
//! Background task that periodically evicts artifacts nobody has requested
//! within the eviction window. Candidates come only from the access tracker:
//! each stale record is removed from the tracker, then the artifact is
//! evicted from memory and disk.
//!
//! A request that touches an id between those two steps keeps its record but
//! loses the cached bytes; the next request for it re-renders.
//!
//! # Configuration
//!
//! ```rust
//! use puml_api::jobs::ReaperConfig;
//! use std::time::Duration;
//!
//! let config = ReaperConfig {
//!     period: Duration::from_secs(15),           // Scan every 15 seconds
//!     eviction_window: Duration::from_secs(300), // Evict after 5 idle minutes
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use puml_core::{duration_millis, PumlResult};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::invalid;
use crate::constants::{DEFAULT_EVICTION_WINDOW_SECS, DEFAULT_REAPER_PERIOD_SECS};
use crate::services::ImageService;
use crate::telemetry::metrics::metrics as prometheus_metrics;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the reaper task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaperConfig {
    /// How often to scan for stale artifacts (default: 15 seconds)
    pub period: Duration,

    /// Artifacts idle for longer than this are evicted (default: 5 minutes)
    pub eviction_window: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(DEFAULT_REAPER_PERIOD_SECS),
            eviction_window: Duration::from_secs(DEFAULT_EVICTION_WINDOW_SECS),
        }
    }
}

impl ReaperConfig {
    /// Create a configuration for development/testing with short intervals.
    pub fn development() -> Self {
        Self {
            period: Duration::from_secs(1),
            eviction_window: Duration::from_secs(10),
        }
    }

    /// Both durations must be positive.
    pub fn validate(&self) -> PumlResult<()> {
        if self.period.is_zero() {
            return Err(invalid("reaper_period", "0", "must be positive"));
        }
        if self.eviction_window.is_zero() {
            return Err(invalid("eviction_window", "0", "must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for reaper activity since startup.
#[derive(Debug, Default)]
pub struct ReaperMetrics {
    /// Completed scan cycles
    pub cycles: AtomicU64,

    /// Artifacts evicted for staleness
    pub reaped: AtomicU64,

    /// Tier evictions that failed
    pub errors: AtomicU64,
}

impl ReaperMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ReaperSnapshot {
        ReaperSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            reaped: self.reaped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of reaper metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperSnapshot {
    pub cycles: u64,
    pub reaped: u64,
    pub errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Run the reaper until the shutdown signal carries `true`.
///
/// The first scan happens one full period after start. Returns the metrics
/// collected over the task's lifetime.
pub async fn reaper_task(
    service: Arc<ImageService>,
    config: ReaperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<ReaperMetrics> {
    let metrics = Arc::new(ReaperMetrics::new());

    let mut ticker = interval(config.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of a tokio interval completes immediately.
    ticker.tick().await;

    tracing::info!(
        period_secs = config.period.as_secs(),
        eviction_window_secs = config.eviction_window.as_secs(),
        "Reaper task started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // A dropped sender also means shutdown.
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Reaper task shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                reap_once(&service, config.eviction_window, &metrics).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        cycles = snapshot.cycles,
        reaped = snapshot.reaped,
        errors = snapshot.errors,
        "Reaper task completed"
    );

    metrics
}

/// Perform one reaper cycle and return the number of artifacts reaped.
pub async fn reap_once(
    service: &ImageService,
    eviction_window: Duration,
    metrics: &ReaperMetrics,
) -> u64 {
    metrics.cycles.fetch_add(1, Ordering::Relaxed);

    let tracker = service.tracker();
    let cutoff = tracker
        .now_millis()
        .saturating_sub(duration_millis(eviction_window));
    let stale = tracker.remove_stale_before(cutoff);

    let mut reaped = 0u64;
    for id in &stale {
        match service.evict_tiers(id).await {
            Ok(()) => {
                reaped += 1;
                tracing::debug!(artifact_id = %id, "Reaped stale artifact");
            }
            Err(e) => {
                metrics.errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(artifact_id = %id, error = %e, "Failed to reap artifact");
            }
        }
    }
    metrics.reaped.fetch_add(reaped, Ordering::Relaxed);

    if let Some(prometheus) = prometheus_metrics() {
        prometheus.record_reap(reaped, tracker.len());
    }

    if stale.is_empty() {
        tracing::trace!("Reaper cycle completed with no stale artifacts");
    } else {
        tracing::info!(
            stale = stale.len(),
            reaped,
            still_tracked = tracker.len(),
            "Reaper cycle completed"
        );
    }

    reaped
}

// ============================================================================
// TESTS
// ============================================================================
