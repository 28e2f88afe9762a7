//! PUML API - Render Cache Service
//!
//! Serves PlantUML diagrams as PNG or SVG over HTTP. Rendered images are
//! cached in memory and on disk under a content-derived id, so each distinct
//! diagram is rendered at most once while it stays in use. A background
//! reaper evicts artifacts nobody has asked for within the eviction window,
//! and shutdown wipes everything.

pub mod config;
pub mod constants;
pub mod error;
pub mod jobs;
pub mod lifecycle;
pub mod macros;
pub mod render;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod validation;

// Re-export commonly used types
pub use config::{HttpConfig, RenderConfig, ServiceConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use jobs::{reap_once, reaper_task, ReaperConfig, ReaperMetrics, ReaperSnapshot};
pub use lifecycle::Lifecycle;
pub use render::PlantUmlCli;
pub use routes::create_api_router;
pub use services::{ImageService, ImageServiceStats};
pub use state::AppState;
