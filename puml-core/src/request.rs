//! Render request types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Rendered image bytes. Shared between tiers without copying; never mutated.
pub type ArtifactBytes = Arc<[u8]>;

/// Image format produced by the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
}

impl OutputFormat {
    /// All supported formats.
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Png, OutputFormat::Svg];

    /// Parse a format name case-insensitively (`"png"`, `"SVG"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "svg" => Some(OutputFormat::Svg),
            _ => None,
        }
    }

    /// Canonical lowercase name, also used as the engine's type flag suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }

    /// MIME type of the rendered bytes.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Svg => "image/svg+xml",
        }
    }

    /// Command-line flag selecting this format in the PlantUML engine.
    pub fn engine_flag(&self) -> &'static str {
        match self {
            OutputFormat::Png => "-tpng",
            OutputFormat::Svg => "-tsvg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to render diagram source text into an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderRequest {
    pub source_text: String,
    pub output_format: OutputFormat,
}

impl RenderRequest {
    pub fn new(source_text: impl Into<String>, output_format: OutputFormat) -> Self {
        Self {
            source_text: source_text.into(),
            output_format,
        }
    }

    pub fn png(source_text: impl Into<String>) -> Self {
        Self::new(source_text, OutputFormat::Png)
    }

    pub fn svg(source_text: impl Into<String>) -> Self {
        Self::new(source_text, OutputFormat::Svg)
    }
}
