//! PUML Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Scriptable renderers and failing tiers
//! - Proptest generators for requests
//! - Fixtures for common scenarios
//! - Assertions on PUML error variants

pub use puml_core::{
    identify, ArtifactBytes, ArtifactId, ManualClock, OutputFormat, PumlError, PumlResult,
    RenderError, RenderGateway, RenderRequest, SharedClock, StorageError,
};
pub use puml_storage::{ArtifactTier, TierStats};

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// MOCK RENDERERS
// ============================================================================

/// Renderer that records every call and produces deterministic bytes.
///
/// The output for a request is `"<format>:<source>"`, so tests can check that
/// the bytes served for an id belong to that id.
#[derive(Debug, Default)]
pub struct CountingRenderer {
    calls: AtomicUsize,
    delay: Option<Duration>,
    failure: Mutex<Option<RenderError>>,
    sources: Mutex<Vec<String>>,
}

impl CountingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every render.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every render with `error` until [`CountingRenderer::recover`].
    pub fn failing(self, error: RenderError) -> Self {
        self.fail_with(error);
        self
    }

    pub fn fail_with(&self, error: RenderError) {
        if let Ok(mut slot) = self.failure.lock() {
            *slot = Some(error);
        }
    }

    pub fn recover(&self) {
        if let Ok(mut slot) = self.failure.lock() {
            *slot = None;
        }
    }

    /// Number of times the engine was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of invocations for one source text.
    pub fn calls_for(&self, source: &str) -> usize {
        self.sources
            .lock()
            .map(|sources| sources.iter().filter(|s| s.as_str() == source).count())
            .unwrap_or(0)
    }

    /// The bytes this renderer produces for a request.
    pub fn expected_bytes(source: &str, format: OutputFormat) -> ArtifactBytes {
        Arc::from(format!("{}:{}", format, source).into_bytes())
    }
}

#[async_trait]
impl RenderGateway for CountingRenderer {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn render(&self, source: &str, format: OutputFormat) -> Result<ArtifactBytes, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut sources) = self.sources.lock() {
            sources.push(source.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().ok().and_then(|slot| slot.clone());
        match failure {
            Some(error) => Err(error),
            None => Ok(Self::expected_bytes(source, format)),
        }
    }
}

/// Renderer that never finishes on its own.
#[derive(Debug, Default)]
pub struct HangingRenderer;

#[async_trait]
impl RenderGateway for HangingRenderer {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn render(&self, _source: &str, _format: OutputFormat) -> Result<ArtifactBytes, RenderError> {
        std::future::pending().await
    }
}

// ============================================================================
// MOCK TIERS
// ============================================================================

/// Tier whose every operation fails with an I/O error.
#[derive(Debug)]
pub struct FailingTier {
    name: &'static str,
    calls: AtomicUsize,
}

impl FailingTier {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, operation: &'static str) -> PumlResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Io {
            operation,
            path: format!("/{}", self.name),
            reason: "simulated failure".to_string(),
        }
        .into())
    }
}

#[async_trait]
impl ArtifactTier for FailingTier {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get(&self, _id: &ArtifactId) -> PumlResult<Option<ArtifactBytes>> {
        self.fail("read")
    }

    async fn put(&self, _id: &ArtifactId, _bytes: ArtifactBytes) -> PumlResult<()> {
        self.fail("write")
    }

    async fn evict(&self, _id: &ArtifactId) -> PumlResult<()> {
        self.fail("remove")
    }

    async fn clear(&self) -> PumlResult<()> {
        self.fail("remove_dir")
    }

    async fn stats(&self) -> PumlResult<TierStats> {
        Ok(TierStats::default())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for request types.

    use super::*;
    use proptest::prelude::*;

    /// Generate an OutputFormat variant.
    pub fn arb_output_format() -> impl Strategy<Value = OutputFormat> {
        prop_oneof![Just(OutputFormat::Png), Just(OutputFormat::Svg)]
    }

    /// Generate a small sequence diagram.
    pub fn arb_diagram_source() -> impl Strategy<Value = String> {
        prop::collection::vec(("[A-Z][a-z]{0,6}", "[A-Z][a-z]{0,6}", "[a-z ]{0,12}"), 1..6)
            .prop_map(|arrows| {
                let body: Vec<String> = arrows
                    .into_iter()
                    .map(|(from, to, label)| format!("{} -> {}: {}", from, to, label))
                    .collect();
                format!("@startuml\n{}\n@enduml", body.join("\n"))
            })
    }

    /// Generate a RenderRequest.
    pub fn arb_render_request() -> impl Strategy<Value = RenderRequest> {
        (arb_diagram_source(), arb_output_format())
            .prop_map(|(source, format)| RenderRequest::new(source, format))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made inputs for common scenarios.

    use super::*;

    /// Epoch millis every test clock starts at.
    pub const CLOCK_START_MILLIS: i64 = 1_700_000_000_000;

    pub const SAMPLE_DIAGRAM: &str = "@startuml\nAlice -> Bob: hello\n@enduml";

    /// Numbered variant of [`SAMPLE_DIAGRAM`], distinct per `n`.
    pub fn diagram(n: usize) -> String {
        format!("@startuml\nAlice -> Bob: message {}\n@enduml", n)
    }

    pub fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(CLOCK_START_MILLIS))
    }

    pub fn scratch_dir() -> tempfile::TempDir {
        match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => panic!("failed to create scratch dir: {}", e),
        }
    }

    pub fn svg_request(source: &str) -> RenderRequest {
        RenderRequest::svg(source)
    }

    pub fn png_request(source: &str) -> RenderRequest {
        RenderRequest::png(source)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on PUML error variants.

    use super::*;

    /// Assert that a result is a render error of any kind.
    #[track_caller]
    pub fn assert_render_error<T: std::fmt::Debug>(result: &PumlResult<T>) {
        match result {
            Err(PumlError::Render(_)) => {}
            other => panic!("Expected Render error, got: {:?}", other),
        }
    }

    /// Assert that a result is a render timeout.
    #[track_caller]
    pub fn assert_timeout<T: std::fmt::Debug>(result: &PumlResult<T>) {
        match result {
            Err(PumlError::Render(RenderError::Timeout { .. })) => {}
            other => panic!("Expected Timeout error, got: {:?}", other),
        }
    }

    /// Assert that a result is a storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &PumlResult<T>) {
        match result {
            Err(PumlError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that a result is a config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &PumlResult<T>) {
        match result {
            Err(PumlError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }
}
