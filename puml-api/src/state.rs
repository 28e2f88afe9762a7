//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use crate::config::HttpConfig;
use crate::services::ImageService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// The render-cache orchestrator.
    pub service: Arc<ImageService>,
    /// Listener settings and upload limits.
    pub http: Arc<HttpConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: Arc<ImageService>, http: HttpConfig) -> Self {
        Self {
            service,
            http: Arc::new(http),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<ImageService>, service);
crate::impl_from_ref!(Arc<HttpConfig>, http);
crate::impl_from_ref!(Instant, start_time);
