//! Error types for PUML operations

use thiserror::Error;

/// Failures of the external rendering engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Diagram syntax error: {message}")]
    Syntax { message: String },

    #[error("Rendering engine failed: {reason}")]
    Engine { reason: String },

    #[error("Rendering timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Rendering engine unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Storage tier errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("I/O error during {operation} on {path}: {reason}")]
    Io {
        operation: &'static str,
        path: String,
        reason: String,
    },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub fn io(operation: &'static str, path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        StorageError::Io {
            operation,
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all PUML errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PumlError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for PUML operations.
pub type PumlResult<T> = Result<T, PumlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_display_timeout() {
        let err = RenderError::Timeout { after_ms: 1500 };
        let msg = format!("{}", err);
        assert!(msg.contains("timed out"));
        assert!(msg.contains("1500"));
    }

    #[test]
    fn test_storage_error_io_constructor() {
        let err = StorageError::io(
            "read",
            "/tmp/plantuml-images/abc.bin",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = format!("{}", err);
        assert!(msg.contains("read"));
        assert!(msg.contains("abc.bin"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "PUML_REAPER_PERIOD_SECS".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("PUML_REAPER_PERIOD_SECS"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_puml_error_from_variants() {
        let render = PumlError::from(RenderError::Engine {
            reason: "crashed".to_string(),
        });
        assert!(matches!(render, PumlError::Render(_)));

        let storage = PumlError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, PumlError::Storage(_)));

        let config = PumlError::from(ConfigError::InvalidValue {
            field: "f".to_string(),
            value: "v".to_string(),
            reason: "r".to_string(),
        });
        assert!(matches!(config, PumlError::Config(_)));
    }
}
