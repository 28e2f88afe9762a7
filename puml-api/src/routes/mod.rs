//! REST API Routes Module
//!
//! - Greeting and health at `/`, `/api`, `/api/health`
//! - Diagram rendering under `/api/plantuml`
//! - Prometheus metrics at `/metrics`

pub mod health;
pub mod plantuml;

use axum::{extract::DefaultBodyLimit, middleware::from_fn, routing::get, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use health::create_router as health_router;
pub use plantuml::create_router as plantuml_router;

/// Room for multipart boundaries and the `outputType` field on top of the
/// file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// `{ success, message, data }` body returned by the JSON endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
///
/// # Middleware Order (outer to inner)
/// 1. Trace - one span per request
/// 2. Observability - Prometheus request metrics
/// 3. Body limit - caps uploads before a handler buffers them
pub fn create_api_router(state: AppState) -> Router {
    let body_limit = state
        .http
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .merge(health::create_router(state.clone()))
        .nest("/api/plantuml", plantuml::create_router(state))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
}
