//! Hand-rolled doubles for the pipeline's collaborator traits.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::backend::{BackendError, GenerationRequest, TextGenBackend};
use crate::dataset::{ProcessedDataset, RawDataset};
use crate::render::{ChartArtifact, ChartRenderer, ChartSpec, RenderError};
use crate::source::{RecordSource, SourceError};

/// A record source that serves a fixed in-memory dataset.
#[derive(Debug, Clone)]
pub struct StaticSource {
    dataset: RawDataset,
}

impl StaticSource {
    /// Creates a source serving `dataset` on every load.
    #[must_use]
    pub fn new(dataset: RawDataset) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl RecordSource for StaticSource {
    async fn load(&self) -> Result<RawDataset, SourceError> {
        Ok(self.dataset.clone())
    }

    fn describe(&self) -> String {
        format!("static source ({} rows)", self.dataset.len())
    }
}

enum SourceFailure {
    NotFound(String),
    Io,
}

/// A record source that always fails.
pub struct FailingSource {
    mode: SourceFailure,
}

impl FailingSource {
    /// Fails with a not-found error naming `path`.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self {
            mode: SourceFailure::NotFound(path.into()),
        }
    }

    /// Fails with a generic read error.
    #[must_use]
    pub fn unreadable() -> Self {
        Self {
            mode: SourceFailure::Io,
        }
    }
}

#[async_trait]
impl RecordSource for FailingSource {
    async fn load(&self) -> Result<RawDataset, SourceError> {
        match &self.mode {
            SourceFailure::NotFound(path) => Err(SourceError::NotFound { path: path.clone() }),
            SourceFailure::Io => Err(SourceError::Io(std::io::Error::other(
                "simulated read failure",
            ))),
        }
    }

    fn describe(&self) -> String {
        "failing source".to_string()
    }
}

/// A backend that answers every request with a fixed reply and records
/// what it was asked.
pub struct ScriptedBackend {
    reply: String,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    /// Creates a backend replying with `reply`.
    #[must_use]
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns every request seen so far.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TextGenBackend for ScriptedBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        self.requests.lock().push(request.clone());
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A backend that always reports a service outage.
#[derive(Debug, Default)]
pub struct FailingBackend {
    calls: AtomicUsize,
}

impl FailingBackend {
    /// Creates the backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the backend was invoked.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenBackend for FailingBackend {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Api {
            status: 503,
            message: "simulated outage".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// A backend that answers only after a delay, for timeout tests.
pub struct SlowBackend {
    delay: Duration,
    reply: String,
}

impl SlowBackend {
    /// Creates a backend sleeping `delay` before replying.
    #[must_use]
    pub fn new(delay: Duration, reply: impl Into<String>) -> Self {
        Self {
            delay,
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl TextGenBackend for SlowBackend {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// A renderer that records specs and fabricates artifact paths.
#[derive(Default)]
pub struct CountingRenderer {
    specs: Mutex<Vec<ChartSpec>>,
}

impl CountingRenderer {
    /// Creates the renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many charts were requested.
    #[must_use]
    pub fn count(&self) -> usize {
        self.specs.lock().len()
    }

    /// Returns every spec seen so far.
    #[must_use]
    pub fn specs(&self) -> Vec<ChartSpec> {
        self.specs.lock().clone()
    }
}

impl ChartRenderer for CountingRenderer {
    fn render(
        &self,
        spec: &ChartSpec,
        _dataset: &ProcessedDataset,
    ) -> Result<ChartArtifact, RenderError> {
        self.specs.lock().push(spec.clone());
        Ok(ChartArtifact {
            kind: spec.kind,
            path: format!("charts/{}.png", spec.file_stem),
        })
    }
}

/// A renderer that always fails to write.
#[derive(Debug, Default)]
pub struct FailingRenderer;

impl FailingRenderer {
    /// Creates the renderer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ChartRenderer for FailingRenderer {
    fn render(
        &self,
        spec: &ChartSpec,
        _dataset: &ProcessedDataset,
    ) -> Result<ChartArtifact, RenderError> {
        Err(RenderError::Write {
            path: format!("charts/{}.png", spec.file_stem),
            source: image::ImageError::IoError(std::io::Error::other("simulated render failure")),
        })
    }
}
