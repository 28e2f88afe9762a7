//! Greeting and Health Endpoints
//!
//! - `GET /` and `GET /api` - greeting
//! - `GET /api/health` - liveness plus cache statistics
//!
//! Both always answer 200 while the process is serving requests.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use super::Envelope;
use crate::services::ImageService;
use crate::state::AppState;

pub const GREETING_MESSAGE: &str = "PlantUML Hello";
pub const HEALTHY_MESSAGE: &str = "Server is in great condition";

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDetails {
    pub version: String,
    pub uptime_seconds: u64,
    /// Artifacts currently held in memory; `None` if the tier could not say.
    pub memory_entries: Option<u64>,
    pub tracked_artifacts: usize,
    pub renders_in_flight: usize,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET / and GET /api
pub async fn greeting() -> Json<Envelope<()>> {
    Json(Envelope::ok(GREETING_MESSAGE, None))
}

/// GET /api/health
pub async fn health(
    State(service): State<Arc<ImageService>>,
    State(start_time): State<Instant>,
) -> Json<Envelope<HealthDetails>> {
    let memory_entries = match service.memory().stats().await {
        Ok(stats) => Some(stats.entry_count),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read memory tier stats");
            None
        }
    };

    let details = HealthDetails {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.elapsed().as_secs(),
        memory_entries,
        tracked_artifacts: service.tracker().len(),
        renders_in_flight: service.inflight(),
    };

    Json(Envelope::ok(HEALTHY_MESSAGE, Some(details)))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(greeting))
        .route("/api", get(greeting))
        .route("/api/health", get(health))
        .with_state(state)
}
