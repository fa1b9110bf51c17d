//! Configuration types for pipeline assembly.
//!
//! All configuration is injected at construction time. The library never
//! reads environment variables or config files; the runner binary maps its
//! environment into these types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory chart files are written into.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Bound on each insight backend call, in seconds. No retries follow.
    #[serde(default = "default_insight_timeout")]
    pub insight_timeout_seconds: f64,
    /// Token budget passed to insight backends.
    #[serde(default = "default_max_insight_tokens")]
    pub max_insight_tokens: u32,
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_insight_timeout() -> f64 {
    30.0
}

fn default_max_insight_tokens() -> u32 {
    500
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            insight_timeout_seconds: default_insight_timeout(),
            max_insight_tokens: default_max_insight_tokens(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chart output directory.
    #[must_use]
    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    /// Sets the insight call timeout.
    #[must_use]
    pub fn with_insight_timeout(mut self, seconds: f64) -> Self {
        self.insight_timeout_seconds = seconds;
        self
    }

    /// Sets the insight token budget.
    #[must_use]
    pub fn with_max_insight_tokens(mut self, tokens: u32) -> Self {
        self.max_insight_tokens = tokens;
        self
    }

    /// Gets the insight timeout as a Duration.
    #[must_use]
    pub fn insight_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.insight_timeout_seconds)
    }
}

/// Credentials and endpoint overrides for one text-generation backend.
///
/// `model` and `base_url` left as `None` use the backend's own defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// API key presented to the service.
    pub api_key: String,
    /// Model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL override, useful for pointing tests at a local server.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl BackendConfig {
    /// Creates a backend configuration from an API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
        }
    }

    /// Sets the model override.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}
