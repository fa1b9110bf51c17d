//! Record sources for the ingest stage.
//!
//! A [`RecordSource`] produces the raw dataset a run starts from. The
//! stock implementation reads a CSV file; tests swap in in-memory
//! sources through the same trait.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dataset::{RawDataset, RawRecord};

/// Errors raised while loading raw records.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source location does not exist.
    #[error("data file not found at {path}")]
    NotFound {
        /// The missing path.
        path: String,
    },

    /// The source exists but could not be read.
    #[error("failed to read data: {0}")]
    Io(#[from] std::io::Error),

    /// The source was read but a record could not be decoded.
    #[error("malformed record: {0}")]
    Malformed(#[from] csv::Error),
}

/// Anything that can produce the raw dataset for a run.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Loads every available record.
    async fn load(&self) -> Result<RawDataset, SourceError>;

    /// A short human-readable description of where records come from.
    fn describe(&self) -> String;
}

/// Reads raw records from a CSV file with a header row.
///
/// Expected columns are `Date`, `Product_Category`, `Product_Name`,
/// `Revenue` and `Units`; the last three may be empty on any row.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    /// Creates a source reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the configured file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for CsvFileSource {
    async fn load(&self) -> Result<RawDataset, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::NotFound {
                path: self.path.display().to_string(),
            });
        }

        let path = self.path.clone();
        // csv reads are blocking; keep them off the async workers.
        let records = tokio::task::spawn_blocking(move || read_csv_records(&path))
            .await
            .map_err(|join_err| SourceError::Io(std::io::Error::other(join_err)))??;

        tracing::debug!(path = %self.path.display(), rows = records.len(), "loaded csv records");
        Ok(RawDataset::new(records))
    }

    fn describe(&self) -> String {
        format!("csv file {}", self.path.display())
    }
}

fn read_csv_records(path: &Path) -> Result<Vec<RawRecord>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut records = Vec::new();
    for row in reader.deserialize::<RawRecord>() {
        records.push(row?);
    }
    Ok(records)
}
