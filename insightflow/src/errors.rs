//! Error types for the insightflow pipeline.
//!
//! Stage failures split into exactly two behaviors: recoverable failures
//! (an analysis backend misbehaving) degrade to a canned narrative, every
//! other failure halts the run at the failing stage.

use thiserror::Error;

use crate::backend::BackendError;
use crate::render::RenderError;
use crate::source::SourceError;

/// The error produced by a stage attempt.
#[derive(Debug, Error)]
pub enum StageError {
    /// A required input key was absent from the run store.
    #[error("required input '{key}' not found in state for {stage}")]
    MissingInput {
        /// The stage that needed the input.
        stage: String,
        /// The absent store key.
        key: &'static str,
    },

    /// The record source could not produce a dataset.
    #[error("record source unavailable: {0}")]
    Source(#[from] SourceError),

    /// An in-memory transform rejected the dataset.
    #[error("transform error: {0}")]
    Transform(String),

    /// A text-generation backend call failed.
    #[error("text generation failed: {0}")]
    Backend(#[from] BackendError),

    /// A chart could not be rendered or written.
    #[error("chart rendering failed: {0}")]
    Render(#[from] RenderError),

    /// A store value could not be encoded or decoded.
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl StageError {
    /// Creates a missing-input error for a stage and key.
    #[must_use]
    pub fn missing_input(stage: impl Into<String>, key: &'static str) -> Self {
        Self::MissingInput {
            stage: stage.into(),
            key,
        }
    }

    /// Creates a transform error with a detail message.
    #[must_use]
    pub fn transform(detail: impl Into<String>) -> Self {
        Self::Transform(detail.into())
    }

    /// Returns true if the failure may be absorbed by a stage fallback.
    ///
    /// Only backend failures qualify; missing inputs, source, transform,
    /// render, and store failures always halt the run.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

/// Error raised by the typed store accessors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A value could not be serialized for storage.
    #[error("failed to encode value for store key '{key}': {source}")]
    Encode {
        /// The store key being written.
        key: &'static str,
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A stored value did not match the shape its key promises.
    #[error("value under store key '{key}' does not match its expected shape: {source}")]
    Decode {
        /// The store key being read.
        key: &'static str,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Error raised when a pipeline is assembled without a required collaborator.
#[derive(Debug, Clone, Error)]
#[error("pipeline is missing its {what}")]
pub struct PipelineBuildError {
    /// The absent collaborator, e.g. "trend backend".
    pub what: &'static str,
}

impl PipelineBuildError {
    /// Creates a build error naming the absent collaborator.
    #[must_use]
    pub fn missing(what: &'static str) -> Self {
        Self { what }
    }
}
