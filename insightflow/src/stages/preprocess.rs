//! The preprocessing stage.

use async_trait::async_trait;

use super::Stage;
use crate::dataset::{parse_flexible_date, ProcessedDataset, ProcessedRecord, RawDataset};
use crate::errors::StageError;
use crate::events::EventEmitter;
use crate::store::{keys, RunStore};

/// Cleans the raw dataset into its typed form.
///
/// Missing numeric cells become zero and date strings are parsed into
/// real dates. The row count never changes: cleaning reshapes rows, it
/// does not drop them. A date that no format recognizes is structural
/// bad data and halts the run.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreprocessStage;

impl PreprocessStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn clean(raw: &RawDataset) -> Result<ProcessedDataset, StageError> {
    let mut rows = Vec::with_capacity(raw.len());
    for record in raw.iter() {
        let date = parse_flexible_date(&record.date)
            .map_err(|err| StageError::transform(format!("row date {:?}: {err}", record.date)))?;
        rows.push(ProcessedRecord {
            date,
            product_category: record.product_category.clone(),
            product_name: record.product_name.clone(),
            revenue: record.revenue.unwrap_or(0.0),
            units: record.units.unwrap_or(0),
        });
    }
    Ok(ProcessedDataset::new(rows))
}

#[async_trait]
impl Stage for PreprocessStage {
    fn name(&self) -> &str {
        "preprocessor"
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &[keys::RAW_DATA]
    }

    fn output_key(&self) -> &'static str {
        keys::PROCESSED_DATA
    }

    fn activity(&self) -> &str {
        "data preprocessing"
    }

    async fn attempt(
        &self,
        store: &RunStore,
        _progress: &EventEmitter,
    ) -> Result<String, StageError> {
        let raw = store
            .raw_dataset()?
            .ok_or_else(|| StageError::missing_input(self.name(), keys::RAW_DATA))?;

        let processed = clean(&raw)?;
        debug_assert_eq!(processed.len(), raw.len());

        let count = processed.len();
        store.set_processed_dataset(&processed)?;
        tracing::info!(rows = count, "processed rows stored");

        Ok(format!(
            "Data preprocessing complete. {count} rows processed and stored in state."
        ))
    }
}
