//! Service Configuration Module
//!
//! Configuration is loaded from `PUML_*` environment variables with defaults
//! from [`crate::constants`]. A variable that is set but cannot be parsed, or
//! a zero period, window or capacity, is a [`ConfigError`].

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use puml_core::{ConfigError, PumlResult};
use puml_storage::cache::config::{DEFAULT_MEMORY_MAX_ENTRIES, DEFAULT_MEMORY_TTL_SECS};
use puml_storage::CacheConfig;

use crate::constants::{
    DEFAULT_API_BIND, DEFAULT_API_PORT, DEFAULT_EVICTION_WINDOW_SECS, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_PLANTUML_BIN, DEFAULT_REAPER_PERIOD_SECS, DEFAULT_RENDER_TIMEOUT_SECS,
};
use crate::jobs::ReaperConfig;

// ============================================================================
// SECTIONS
// ============================================================================

/// How diagrams are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// PlantUML executable (absolute path or a name resolved through `PATH`).
    pub plantuml_bin: PathBuf,
    /// Upper bound on a single engine invocation.
    pub timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            plantuml_bin: PathBuf::from(DEFAULT_PLANTUML_BIN),
            timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
        }
    }
}

/// HTTP listener and request limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Largest accepted diagram upload in bytes.
    pub max_upload_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_API_BIND.to_string(),
            port: DEFAULT_API_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl HttpConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

// ============================================================================
// SERVICE CONFIGURATION
// ============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    pub cache: CacheConfig,
    pub reaper: ReaperConfig,
    pub render: RenderConfig,
    pub http: HttpConfig,
}

impl ServiceConfig {
    /// Create ServiceConfig from environment variables.
    ///
    /// Environment variables:
    /// - `PUML_EVICTION_WINDOW_SECS`: staleness cutoff (default: 300)
    /// - `PUML_REAPER_PERIOD_SECS`: reaper period (default: 15)
    /// - `PUML_MEMORY_MAX_ENTRIES`: in-memory capacity (default: 10000)
    /// - `PUML_MEMORY_TTL_SECS`: in-memory idle TTL (default: 3600)
    /// - `PUML_SCRATCH_DIR`: artifact directory (default: `<tmp>/plantuml-images`)
    /// - `PUML_RENDER_TIMEOUT_SECS`: engine timeout (default: 30)
    /// - `PUML_PLANTUML_BIN`: engine executable (default: `plantuml`)
    /// - `PUML_MAX_UPLOAD_BYTES`: upload limit (default: 10 MiB)
    /// - `PUML_API_BIND`: bind host (default: 0.0.0.0)
    /// - `PORT` or `PUML_API_PORT`: listen port (default: 8080)
    pub fn from_env() -> PumlResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> PumlResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = CacheConfig::default();
        let cache = CacheConfig {
            memory_max_entries: parse_or(&lookup, "PUML_MEMORY_MAX_ENTRIES", DEFAULT_MEMORY_MAX_ENTRIES)?,
            memory_ttl: Duration::from_secs(parse_or(
                &lookup,
                "PUML_MEMORY_TTL_SECS",
                DEFAULT_MEMORY_TTL_SECS,
            )?),
            scratch_dir: lookup("PUML_SCRATCH_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
        };

        let reaper = ReaperConfig {
            period: Duration::from_secs(parse_or(
                &lookup,
                "PUML_REAPER_PERIOD_SECS",
                DEFAULT_REAPER_PERIOD_SECS,
            )?),
            eviction_window: Duration::from_secs(parse_or(
                &lookup,
                "PUML_EVICTION_WINDOW_SECS",
                DEFAULT_EVICTION_WINDOW_SECS,
            )?),
        };

        let render = RenderConfig {
            plantuml_bin: lookup("PUML_PLANTUML_BIN")
                .filter(|bin| !bin.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PLANTUML_BIN)),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "PUML_RENDER_TIMEOUT_SECS",
                DEFAULT_RENDER_TIMEOUT_SECS,
            )?),
        };

        let port_key = if lookup("PORT").is_some() {
            "PORT"
        } else {
            "PUML_API_PORT"
        };
        let http = HttpConfig {
            bind: lookup("PUML_API_BIND").unwrap_or_else(|| DEFAULT_API_BIND.to_string()),
            port: parse_or(&lookup, port_key, DEFAULT_API_PORT)?,
            max_upload_bytes: parse_or(&lookup, "PUML_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        };

        let config = Self {
            cache,
            reaper,
            render,
            http,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> PumlResult<()> {
        self.reaper.validate()?;
        if self.cache.memory_max_entries == 0 {
            return Err(invalid("memory_max_entries", "0", "must be at least 1"));
        }
        if self.render.timeout.is_zero() {
            return Err(invalid("render_timeout", "0", "must be positive"));
        }
        if self.http.max_upload_bytes == 0 {
            return Err(invalid("max_upload_bytes", "0", "must be positive"));
        }
        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> PumlResult<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| invalid(key, &raw, "not a valid number")),
    }
}

pub(crate) fn invalid(field: &str, value: &str, reason: &str) -> puml_core::PumlError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
