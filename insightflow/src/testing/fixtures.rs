//! Canned datasets for tests and benches.

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::{
    parse_flexible_date, ProcessedDataset, ProcessedRecord, RawDataset, RawRecord,
};

fn raw(
    date: &str,
    category: &str,
    name: &str,
    revenue: f64,
    units: u32,
) -> RawRecord {
    RawRecord {
        date: date.to_string(),
        product_category: category.to_string(),
        product_name: Some(name.to_string()),
        revenue: Some(revenue),
        units: Some(units),
    }
}

/// The three-product Q1 2023 dataset the sample CSV ships with.
///
/// AlphaSpark climbs steeply, BetaBolt grows slowly while its unit count
/// slips, GammaGizmo sells few units at a high price.
#[must_use]
pub fn q1_sales() -> RawDataset {
    RawDataset::new(vec![
        raw("2023-01-15", "Gadgets", "AlphaSpark", 1200.0, 12),
        raw("2023-01-15", "Widgets", "BetaBolt", 450.0, 30),
        raw("2023-01-15", "Gizmos", "GammaGizmo", 400.0, 4),
        raw("2023-02-15", "Gadgets", "AlphaSpark", 1440.0, 12),
        raw("2023-02-15", "Widgets", "BetaBolt", 475.0, 28),
        raw("2023-02-15", "Gizmos", "GammaGizmo", 415.0, 4),
        raw("2023-03-15", "Gadgets", "AlphaSpark", 1800.0, 15),
        raw("2023-03-15", "Widgets", "BetaBolt", 500.0, 27),
        raw("2023-03-15", "Gizmos", "GammaGizmo", 435.0, 4),
    ])
}

/// Three rows where the middle one is missing both numeric fields.
#[must_use]
pub fn three_row_sample() -> RawDataset {
    RawDataset::new(vec![
        raw("2023-01-15", "Gadgets", "AlphaSpark", 1200.0, 12),
        RawRecord {
            date: "2023-01-16".to_string(),
            product_category: "Widgets".to_string(),
            product_name: Some("BetaBolt".to_string()),
            revenue: None,
            units: None,
        },
        raw("2023-01-17", "Gizmos", "GammaGizmo", 400.0, 4),
    ])
}

/// [`q1_sales`] after preprocessing, for stages downstream of it.
#[must_use]
pub fn processed_q1_sales() -> ProcessedDataset {
    let rows = q1_sales()
        .records()
        .iter()
        .map(|record| ProcessedRecord {
            date: parse_flexible_date(&record.date).unwrap_or_default(),
            product_category: record.product_category.clone(),
            product_name: record.product_name.clone(),
            revenue: record.revenue.unwrap_or(0.0),
            units: record.units.unwrap_or(0),
        })
        .collect();
    ProcessedDataset::new(rows)
}

/// A processed dataset whose rows carry no product names.
#[must_use]
pub fn processed_without_names() -> ProcessedDataset {
    let rows = processed_q1_sales()
        .records()
        .iter()
        .map(|record| ProcessedRecord {
            product_name: None,
            ..record.clone()
        })
        .collect();
    ProcessedDataset::new(rows)
}

/// A reproducible dataset of arbitrary size for benches.
#[must_use]
pub fn synthetic_sales(rows: usize, seed: u64) -> RawDataset {
    const CATEGORIES: [(&str, &str); 3] = [
        ("Gadgets", "AlphaSpark"),
        ("Widgets", "BetaBolt"),
        ("Gizmos", "GammaGizmo"),
    ];

    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();

    let records = (0..rows)
        .map(|i| {
            let (category, name) = CATEGORIES[i % CATEGORIES.len()];
            let date = start
                .checked_add_days(Days::new((i / CATEGORIES.len()) as u64 % 365))
                .unwrap_or(start);
            RawRecord {
                date: date.format("%Y-%m-%d").to_string(),
                product_category: category.to_string(),
                product_name: Some(name.to_string()),
                revenue: Some(rng.gen_range(100.0..2000.0_f64).round()),
                units: Some(rng.gen_range(1..50)),
            }
        })
        .collect();
    RawDataset::new(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_q1_sales_shape() {
        let dataset = q1_sales();
        assert_eq!(dataset.len(), 9);
        assert!(dataset
            .records()
            .iter()
            .all(|r| r.revenue.is_some() && r.units.is_some()));
    }

    #[test]
    fn test_three_row_sample_has_one_gap_row() {
        let dataset = three_row_sample();
        assert_eq!(dataset.len(), 3);
        assert!(dataset.records()[1].revenue.is_none());
        assert!(dataset.records()[1].units.is_none());
    }

    #[test]
    fn test_synthetic_sales_is_reproducible() {
        let a = synthetic_sales(50, 7);
        let b = synthetic_sales(50, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
    }

    #[test]
    fn test_processed_without_names_strips_names() {
        assert!(processed_without_names()
            .records()
            .iter()
            .all(|r| r.product_name.is_none()));
    }
}
