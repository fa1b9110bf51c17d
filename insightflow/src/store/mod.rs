//! The shared state store for one pipeline run.
//!
//! Stages communicate only through [`RunStore`]: each writes its single
//! output key, later stages read what they need. Values are JSON so any
//! key can be inspected generically, but normal access goes through the
//! typed accessors, which keep key strings and value shapes in one place.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::dataset::{ProcessedDataset, RawDataset};
use crate::errors::StoreError;
use crate::render::ChartArtifact;
use crate::stages::InsightKind;

/// Well-known store keys. One writer per key per run.
pub mod keys {
    /// The ingested dataset, written by the collector.
    pub const RAW_DATA: &str = "raw_data";
    /// The cleaned dataset, written by the preprocessor.
    pub const PROCESSED_DATA: &str = "processed_data";
    /// The trend narrative, written by the trend analyst.
    pub const TREND_INSIGHT: &str = "trend_insight";
    /// The anomaly narrative, written by the anomaly analyst.
    pub const ANOMALY_INSIGHT: &str = "anomaly_insight";
    /// The ordered chart manifest, written by the visualizer.
    pub const VISUALIZATION_PATHS: &str = "visualization_paths";
}

/// A thread-safe key/value store scoped to one pipeline run.
///
/// Writes are last-writer-wins; overwriting is not expected in normal
/// operation and is logged when it happens. The analyst pair writes
/// disjoint keys concurrently, which needs nothing beyond the inner lock.
#[derive(Debug)]
pub struct RunStore {
    run_id: Uuid,
    values: RwLock<HashMap<String, serde_json::Value>>,
}

impl Default for RunStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStore {
    /// Creates an empty store with a fresh run id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a store pre-populated with values, for tests and tooling.
    #[must_use]
    pub fn from_values(values: HashMap<String, serde_json::Value>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            values: RwLock::new(values),
        }
    }

    /// Returns the run id this store belongs to.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Gets a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.values.read().get(key).cloned()
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Sets a value, last-writer-wins.
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        let mut values = self.values.write();
        if values.contains_key(&key) {
            tracing::debug!(run_id = %self.run_id, key = %key, "overwriting existing store key");
        }
        values.insert(key, value);
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Returns all keys.
    #[must_use]
    pub fn key_list(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Returns a copy of the full contents.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, serde_json::Value> {
        self.values.read().clone()
    }

    fn set_typed<T: Serialize>(&self, key: &'static str, value: &T) -> Result<(), StoreError> {
        let encoded =
            serde_json::to_value(value).map_err(|source| StoreError::Encode { key, source })?;
        self.set(key, encoded);
        Ok(())
    }

    fn get_typed<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>, StoreError> {
        match self.get(key) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StoreError::Decode { key, source }),
            None => Ok(None),
        }
    }

    /// Reads the ingested dataset.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the stored value has the wrong shape.
    pub fn raw_dataset(&self) -> Result<Option<RawDataset>, StoreError> {
        self.get_typed(keys::RAW_DATA)
    }

    /// Stores the ingested dataset.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Encode` if the dataset cannot be serialized.
    pub fn set_raw_dataset(&self, dataset: &RawDataset) -> Result<(), StoreError> {
        self.set_typed(keys::RAW_DATA, dataset)
    }

    /// Reads the cleaned dataset.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the stored value has the wrong shape.
    pub fn processed_dataset(&self) -> Result<Option<ProcessedDataset>, StoreError> {
        self.get_typed(keys::PROCESSED_DATA)
    }

    /// Stores the cleaned dataset.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Encode` if the dataset cannot be serialized.
    pub fn set_processed_dataset(&self, dataset: &ProcessedDataset) -> Result<(), StoreError> {
        self.set_typed(keys::PROCESSED_DATA, dataset)
    }

    /// Reads the narrative produced by one analyst.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the stored value is not a string.
    pub fn insight(&self, kind: InsightKind) -> Result<Option<String>, StoreError> {
        self.get_typed(kind.state_key())
    }

    /// Stores the narrative produced by one analyst.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Encode` on serialization failure.
    pub fn set_insight(&self, kind: InsightKind, text: impl Into<String>) -> Result<(), StoreError> {
        self.set_typed(kind.state_key(), &text.into())
    }

    /// Reads the ordered chart manifest.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the stored value has the wrong shape.
    pub fn chart_manifest(&self) -> Result<Option<Vec<ChartArtifact>>, StoreError> {
        self.get_typed(keys::VISUALIZATION_PATHS)
    }

    /// Stores the ordered chart manifest.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Encode` on serialization failure.
    pub fn set_chart_manifest(&self, charts: &[ChartArtifact]) -> Result<(), StoreError> {
        self.set_typed(keys::VISUALIZATION_PATHS, &charts)
    }
}
