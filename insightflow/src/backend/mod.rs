//! Text generation backends for the analyst stages.
//!
//! Each analyst hands a prompt to a [`TextGenBackend`] and stores the
//! returned narrative. The HTTP-backed implementations live behind the
//! `http-backends` feature; tests use the scripted backends from
//! [`crate::testing`] instead.

#[cfg(feature = "http-backends")]
mod gemini;
#[cfg(feature = "http-backends")]
mod openai;

#[cfg(feature = "http-backends")]
pub use gemini::GeminiBackend;
#[cfg(feature = "http-backends")]
pub use openai::OpenAiBackend;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by text generation.
///
/// Every variant counts as a service failure to the pipeline: an analyst
/// that sees one falls back to its canned narrative rather than halting
/// the run.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The request never completed at the transport level.
    #[cfg(feature = "http-backends")]
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service rejected the credentials.
    #[error("authentication rejected (HTTP {status}); check the API key")]
    Auth {
        /// The HTTP status returned, 401 or 403.
        status: u16,
    },

    /// The service returned a non-success status.
    #[error("service error: HTTP {status}: {message}")]
    Api {
        /// The HTTP status returned.
        status: u16,
        /// The response body, as far as it could be read.
        message: String,
    },

    /// The service answered but not in the shape we expect.
    #[error("unexpected response shape: {0}")]
    Malformed(String),

    /// The request did not finish within the configured budget.
    #[error("no response within {secs} seconds")]
    Timeout {
        /// The budget that was exceeded.
        secs: f64,
    },
}

/// A single text generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The full prompt, dataset included.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Creates a request.
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

/// Anything that can turn a prompt into narrative text.
#[async_trait]
pub trait TextGenBackend: Send + Sync {
    /// Generates text for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError>;

    /// A short name for logs, such as `"gemini"`.
    fn name(&self) -> &str;
}
