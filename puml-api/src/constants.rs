//! Constants for the PUML API
//!
//! Defaults for every tunable the service reads from its environment.

// ============================================================================
// CACHE LIFECYCLE
// ============================================================================

/// Default staleness cutoff in seconds (5 minutes)
pub const DEFAULT_EVICTION_WINDOW_SECS: u64 = 300;

/// Default reaper period in seconds
pub const DEFAULT_REAPER_PERIOD_SECS: u64 = 15;

// ============================================================================
// RENDERING
// ============================================================================

/// Default upper bound on one engine invocation in seconds
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;

/// Default PlantUML executable, resolved through `PATH`
pub const DEFAULT_PLANTUML_BIN: &str = "plantuml";

// ============================================================================
// HTTP
// ============================================================================

/// Default bind host
pub const DEFAULT_API_BIND: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_API_PORT: u16 = 8080;

/// Default maximum size of an uploaded diagram file (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Media types accepted for uploaded diagram files
pub const ALLOWED_UPLOAD_CONTENT_TYPES: &[&str] =
    &["text/plantuml", "application/x-plantuml", "text/plain"];
