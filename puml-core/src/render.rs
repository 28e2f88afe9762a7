//! The seam between the cache and whatever actually draws diagrams.

use async_trait::async_trait;

use crate::error::RenderError;
use crate::request::{ArtifactBytes, OutputFormat};

/// Turns diagram source text into image bytes.
///
/// Implementations are called only on a full cache miss, at most once per
/// artifact id at a time. They must not cache on their own.
///
/// # Example
///
/// ```ignore
/// let bytes = gateway.render("@startuml\nA -> B\n@enduml", OutputFormat::Svg).await?;
/// ```
#[async_trait]
pub trait RenderGateway: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    async fn render(&self, source: &str, format: OutputFormat)
        -> Result<ArtifactBytes, RenderError>;
}
