//! Date parsing for raw sales records.
//!
//! Raw records carry dates as strings in whatever shape the source used.
//! Preprocessing funnels every one of them through [`parse_flexible_date`];
//! a string no format accepts is a structural defect of the dataset, not a
//! gap that can be filled.

use chrono::{DateTime, NaiveDate};
use thiserror::Error;

/// Errors that can occur while parsing a record date.
#[derive(Debug, Error)]
pub enum DateParseError {
    /// The date string is empty.
    #[error("empty date string")]
    Empty,

    /// No supported format accepts the string.
    #[error("unrecognized date: {0}")]
    Unrecognized(String),
}

/// Formats tried in order, most common first. Year-first comes before
/// day-first so ISO strings never fall through to the `%d-%m-%Y` reading.
const DATE_FORMATS: [&str; 5] = [
    "%Y-%m-%d", // 2023-01-15
    "%m/%d/%Y", // 01/15/2023
    "%d-%m-%Y", // 15-01-2023
    "%Y/%m/%d", // 2023/01/15
    "%d %b %Y", // 15 Jan 2023
];

/// Parses a record date from the formats seen in sales exports.
///
/// Full RFC 3339 timestamps are accepted and truncated to their date.
///
/// # Examples
///
/// ```
/// use insightflow::dataset::parse_flexible_date;
///
/// let date = parse_flexible_date("2023-01-15").unwrap();
/// assert_eq!(date.to_string(), "2023-01-15");
/// ```
///
/// # Errors
///
/// Returns `DateParseError` if the string is empty or unrecognized.
pub fn parse_flexible_date(input: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(DateParseError::Empty);
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }

    Err(DateParseError::Unrecognized(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_iso_date() {
        let date = parse_flexible_date("2023-01-15").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2023, 1, 15));
    }

    #[test]
    fn test_parse_us_date() {
        let date = parse_flexible_date("01/15/2023").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2023, 1, 15));
    }

    #[test]
    fn test_parse_day_first_dashed_date() {
        let date = parse_flexible_date("15-01-2023").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2023, 1, 15));
    }

    #[test]
    fn test_iso_wins_over_day_first_reading() {
        // "2023-01-15" must not parse as day 2023.
        let date = parse_flexible_date("2023-01-15").unwrap();
        assert_eq!(date.year(), 2023);
    }

    #[test]
    fn test_parse_slash_iso_date() {
        let date = parse_flexible_date("2023/01/15").unwrap();
        assert_eq!(date.day(), 15);
    }

    #[test]
    fn test_parse_abbreviated_month() {
        let date = parse_flexible_date("15 Jan 2023").unwrap();
        assert_eq!(date.month(), 1);
    }

    #[test]
    fn test_parse_rfc3339_truncates_to_date() {
        let date = parse_flexible_date("2023-01-15T10:30:00+00:00").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2023, 1, 15));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(parse_flexible_date("  2023-01-15  ").is_ok());
    }

    #[test]
    fn test_parse_empty_string() {
        assert!(matches!(parse_flexible_date("   "), Err(DateParseError::Empty)));
    }

    #[test]
    fn test_parse_unrecognized() {
        let err = parse_flexible_date("first of never").unwrap_err();
        assert_eq!(err.to_string(), "unrecognized date: first of never");
    }
}
