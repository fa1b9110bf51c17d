//! The ingest stage.

use async_trait::async_trait;
use std::sync::Arc;

use super::Stage;
use crate::errors::StageError;
use crate::events::EventEmitter;
use crate::source::RecordSource;
use crate::store::{keys, RunStore};

/// Loads raw records from a [`RecordSource`] into the store.
///
/// There is no fallback here: without a real dataset the rest of the
/// pipeline has nothing meaningful to work on, so any source failure
/// halts the run.
pub struct CollectStage {
    source: Arc<dyn RecordSource>,
}

impl CollectStage {
    /// Creates the stage around a record source.
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Stage for CollectStage {
    fn name(&self) -> &str {
        "collector"
    }

    fn output_key(&self) -> &'static str {
        keys::RAW_DATA
    }

    fn activity(&self) -> &str {
        "data collection"
    }

    async fn attempt(
        &self,
        store: &RunStore,
        _progress: &EventEmitter,
    ) -> Result<String, StageError> {
        tracing::info!(source = %self.source.describe(), "collecting raw records");
        let dataset = self.source.load().await?;
        let count = dataset.len();

        store.set_raw_dataset(&dataset)?;
        tracing::info!(rows = count, "raw records stored");

        Ok(format!(
            "Data collection complete. {count} raw records loaded into state."
        ))
    }
}
