//! Prometheus Metrics Definitions
//!
//! Defines the render-cache metrics and the /metrics endpoint for
//! Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, Encoder, HistogramVec, IntCounter, IntGauge, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Engine invocation latency buckets (seconds). Renders are slow.
const RENDER_LATENCY_BUCKETS: &[f64] = &[0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance - initialized once on first use
pub static METRICS: Lazy<ApiResult<PumlMetrics>> = Lazy::new(PumlMetrics::new);

/// The registered metrics, or `None` if registration failed.
pub fn metrics() -> Option<&'static PumlMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all PUML metrics.
#[derive(Clone)]
pub struct PumlMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Artifact lookups - labels: outcome (memory, disk, coalesced, miss)
    pub artifact_lookups_total: CounterVec,

    /// Engine invocations - labels: format, status (success, failure)
    pub renders_total: CounterVec,

    /// Engine invocation duration - labels: format
    pub render_duration_seconds: HistogramVec,

    /// Artifacts removed by the reaper
    pub artifacts_reaped_total: IntCounter,

    /// Artifacts currently holding an access record
    pub tracked_artifacts: IntGauge,
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl PumlMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "puml_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "puml_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            artifact_lookups_total: register_counter_vec!(
                "puml_artifact_lookups_total",
                "Artifact lookups by the tier that answered",
                &["outcome"]
            )
            .map_err(|e| registration_error("artifact_lookups_total", e))?,

            renders_total: register_counter_vec!(
                "puml_renders_total",
                "Rendering engine invocations",
                &["format", "status"]
            )
            .map_err(|e| registration_error("renders_total", e))?,

            render_duration_seconds: register_histogram_vec!(
                "puml_render_duration_seconds",
                "Rendering engine invocation duration in seconds",
                &["format"],
                RENDER_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("render_duration_seconds", e))?,

            artifacts_reaped_total: register_int_counter!(
                "puml_artifacts_reaped_total",
                "Artifacts evicted by the reaper for staleness"
            )
            .map_err(|e| registration_error("artifacts_reaped_total", e))?,

            tracked_artifacts: register_int_gauge!(
                "puml_tracked_artifacts",
                "Artifacts currently holding an access record"
            )
            .map_err(|e| registration_error("tracked_artifacts", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record how a lookup was answered: `memory`, `disk`, `coalesced` or `miss`.
    pub fn record_lookup(&self, outcome: &str) {
        self.artifact_lookups_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record one engine invocation.
    pub fn record_render(&self, format: &str, success: bool, duration_secs: f64) {
        let status = if success { "success" } else { "failure" };
        self.renders_total
            .with_label_values(&[format, status])
            .inc();
        self.render_duration_seconds
            .with_label_values(&[format])
            .observe(duration_secs);
    }

    /// Record a finished reaper cycle.
    pub fn record_reap(&self, reaped: u64, still_tracked: usize) {
        self.artifacts_reaped_total.inc_by(reaped);
        self.tracked_artifacts
            .set(i64::try_from(still_tracked).unwrap_or(i64::MAX));
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    // Make sure our collectors exist even before the first request.
    let _ = metrics();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
