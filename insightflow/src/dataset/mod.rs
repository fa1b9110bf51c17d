//! Sales record types and dataset containers.
//!
//! Two row shapes move through the pipeline: [`RawRecord`] as ingested
//! (missing numerics allowed, dates still strings) and [`ProcessedRecord`]
//! after preprocessing (numerics filled, dates typed). Serde field names
//! keep the original export's column headers so CSV and store JSON agree.

mod dates;

pub use dates::{parse_flexible_date, DateParseError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sales row as it arrives from the record source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Sale date, unparsed.
    #[serde(rename = "Date")]
    pub date: String,
    /// Product category, e.g. "Gadgets".
    #[serde(rename = "Product_Category")]
    pub product_category: String,
    /// Product name; some exports omit the column.
    #[serde(rename = "Product_Name", default)]
    pub product_name: Option<String>,
    /// Revenue for the row; empty cells arrive as `None`.
    #[serde(rename = "Revenue", default)]
    pub revenue: Option<f64>,
    /// Units sold; empty cells arrive as `None`.
    #[serde(rename = "Units", default)]
    pub units: Option<u32>,
}

/// A sales row after preprocessing. No missing numerics by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    /// Sale date.
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    /// Product category.
    #[serde(rename = "Product_Category")]
    pub product_category: String,
    /// Product name, when the source carried one.
    #[serde(rename = "Product_Name", default)]
    pub product_name: Option<String>,
    /// Revenue, zero-filled where the raw row was empty.
    #[serde(rename = "Revenue")]
    pub revenue: f64,
    /// Units sold, zero-filled where the raw row was empty.
    #[serde(rename = "Units")]
    pub units: u32,
}

/// An ordered collection of raw records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDataset(Vec<RawRecord>);

impl RawDataset {
    /// Creates a dataset from records.
    #[must_use]
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self(records)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the rows in order.
    #[must_use]
    pub fn records(&self) -> &[RawRecord] {
        &self.0
    }

    /// Iterates over the rows in order.
    pub fn iter(&self) -> std::slice::Iter<'_, RawRecord> {
        self.0.iter()
    }
}

impl From<Vec<RawRecord>> for RawDataset {
    fn from(records: Vec<RawRecord>) -> Self {
        Self(records)
    }
}

/// An ordered collection of processed records plus the aggregations the
/// visualization stage draws from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedDataset(Vec<ProcessedRecord>);

impl ProcessedDataset {
    /// Creates a dataset from records.
    #[must_use]
    pub fn new(records: Vec<ProcessedRecord>) -> Self {
        Self(records)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the rows in order.
    #[must_use]
    pub fn records(&self) -> &[ProcessedRecord] {
        &self.0
    }

    /// Iterates over the rows in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ProcessedRecord> {
        self.0.iter()
    }

    /// Serializes the rows as a JSON array, the form insight prompts embed.
    ///
    /// # Errors
    ///
    /// Returns the underlying serialization error.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    /// Returns the distinct categories in sorted order.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let set: std::collections::BTreeSet<&str> =
            self.0.iter().map(|r| r.product_category.as_str()).collect();
        set.into_iter().map(String::from).collect()
    }

    /// Returns revenue points per category, each series sorted by date.
    #[must_use]
    pub fn series_by_category(&self) -> BTreeMap<String, Vec<(NaiveDate, f64)>> {
        let mut series: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for record in &self.0 {
            series
                .entry(record.product_category.clone())
                .or_default()
                .push((record.date, record.revenue));
        }
        for points in series.values_mut() {
            points.sort_by_key(|(date, _)| *date);
        }
        series
    }

    /// Returns total revenue per product name, descending, ties by name.
    ///
    /// Rows without a product name are left out.
    #[must_use]
    pub fn revenue_by_product(&self) -> Vec<(String, f64)> {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for record in &self.0 {
            if let Some(name) = &record.product_name {
                *totals.entry(name.clone()).or_insert(0.0) += record.revenue;
            }
        }
        let mut ranked: Vec<(String, f64)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    /// Returns the earliest and latest dates, if any rows exist.
    #[must_use]
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.0.iter().map(|r| r.date).min()?;
        let max = self.0.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// Sums revenue across all rows.
    #[must_use]
    pub fn total_revenue(&self) -> f64 {
        self.0.iter().map(|r| r.revenue).sum()
    }

    /// Returns true if any row carries a product name.
    #[must_use]
    pub fn has_product_names(&self) -> bool {
        self.0.iter().any(|r| r.product_name.is_some())
    }
}

impl From<Vec<ProcessedRecord>> for ProcessedDataset {
    fn from(records: Vec<ProcessedRecord>) -> Self {
        Self(records)
    }
}
