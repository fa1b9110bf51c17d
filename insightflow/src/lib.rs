//! # Insightflow
//!
//! A fixed-shape sales analysis pipeline.
//!
//! Every run walks the same four phases over a shared per-run store:
//!
//! - **Ingest**: load raw sales rows from a CSV export
//! - **Preprocess**: type the dates, zero-fill missing numerics
//! - **Analyze**: two independent text-generation analysts, run
//!   concurrently, one for trends and one for anomalies
//! - **Visualize**: paint the revenue charts and record their paths
//!
//! Stages communicate only through the store, announce progress through
//! a per-stage event stream, and degrade to canned narratives when an
//! analysis backend is unreachable. The dataset-touching stages have no
//! fallback; their failures halt the run.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use insightflow::prelude::*;
//! use std::sync::Arc;
//!
//! let pipeline = InsightPipeline::builder()
//!     .with_config(PipelineConfig::new().with_out_dir("results"))
//!     .with_source(Arc::new(CsvFileSource::new("data/sample_sales_data.csv")))
//!     .with_trend_backend(Arc::new(GeminiBackend::new("google-api-key")))
//!     .with_anomaly_backend(Arc::new(OpenAiBackend::new("openai-api-key")))
//!     .build()?;
//!
//! let store = Arc::new(RunStore::new());
//! let report = pipeline.execute(&store).await;
//! println!("run {} finished: {}", report.run_id, report.state);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backend;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod stages;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{BackendError, GenerationRequest, TextGenBackend};
    #[cfg(feature = "http-backends")]
    pub use crate::backend::{GeminiBackend, OpenAiBackend};
    pub use crate::config::{BackendConfig, PipelineConfig};
    pub use crate::dataset::{
        parse_flexible_date, ProcessedDataset, ProcessedRecord, RawDataset, RawRecord,
    };
    pub use crate::errors::{PipelineBuildError, StageError, StoreError};
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, StageEvent,
    };
    pub use crate::pipeline::{
        InsightPipeline, PipelineBuilder, PipelinePhase, PipelineReport, PipelineState,
    };
    pub use crate::render::{
        ChartArtifact, ChartKind, ChartRenderer, ChartSpec, PngChartRenderer,
    };
    pub use crate::source::{CsvFileSource, RecordSource};
    pub use crate::stages::{InsightKind, Stage};
    pub use crate::store::{keys, RunStore};
}
