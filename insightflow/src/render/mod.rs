//! Chart rendering for the visualization stage.
//!
//! The visualizer describes what it wants with a [`ChartSpec`] and a
//! [`ChartRenderer`] turns that plus the dataset into a file on disk,
//! reported back as a [`ChartArtifact`]. The stock renderer paints PNGs;
//! tests substitute counting or failing renderers.

mod font;
mod png;

pub use png::PngChartRenderer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The chart shapes the visualizer knows how to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Revenue over time, one line per product category.
    TimeSeries,
    /// Total revenue per product, highest first.
    Bar,
}

/// A description of one chart to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSpec {
    /// Which shape to draw.
    pub kind: ChartKind,
    /// Heading painted across the top.
    pub title: String,
    /// Annotation painted along the bottom, often an insight snippet.
    pub caption: String,
    /// Output file name without directory or extension.
    pub file_stem: String,
}

impl ChartSpec {
    /// Creates a spec.
    pub fn new(
        kind: ChartKind,
        title: impl Into<String>,
        caption: impl Into<String>,
        file_stem: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            caption: caption.into(),
            file_stem: file_stem.into(),
        }
    }
}

/// A chart that was written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartArtifact {
    /// Which shape was drawn.
    pub kind: ChartKind,
    /// Where the file landed, as given to the filesystem.
    pub path: String,
}

/// Errors raised while producing chart files.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The output directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    OutDir {
        /// The directory that was being created.
        path: String,
        /// The underlying filesystem error.
        source: std::io::Error,
    },

    /// The image file could not be written.
    #[error("failed to write chart {path}: {source}")]
    Write {
        /// The file that was being written.
        path: String,
        /// The underlying encoder error.
        source: image::ImageError,
    },
}

/// Anything that can materialize a [`ChartSpec`] against a dataset.
pub trait ChartRenderer: Send + Sync {
    /// Draws `spec` over `dataset` and writes the result.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the output directory or file cannot
    /// be produced.
    fn render(
        &self,
        spec: &ChartSpec,
        dataset: &crate::dataset::ProcessedDataset,
    ) -> Result<ChartArtifact, RenderError>;
}
