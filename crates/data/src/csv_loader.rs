use chrono::{DateTime, NaiveDate, NaiveDateTime};
use fxta_core::{DataError, PricePoint, PriceSeries};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

/// Load daily closes from a CSV file.
///
/// Expected columns (case-insensitive, flexible ordering):
/// `date` (or `timestamp`, `datetime`) and `close` (or `adj close`, `c`).
/// Other columns are ignored. Rows with an empty close are skipped.
pub fn load_closes_from_csv(path: &Path, symbol: &str) -> Result<PriceSeries, DataError> {
    let mut reader = open_reader(path)?;

    let headers = reader
        .headers()
        .map_err(|e| DataError::ParseError(format!("Failed to read headers: {}", e)))?
        .clone();

    let date_col = find_column(&headers, &["date", "timestamp", "datetime", "time"])
        .ok_or_else(|| DataError::ParseError("No date column found".into()))?;
    let close_col = find_column(&headers, &["close", "adj close", "adj_close", "c"])
        .ok_or_else(|| DataError::ParseError("No close column found".into()))?;

    let mut points = Vec::new();
    for result in reader.records() {
        let record =
            result.map_err(|e| DataError::ParseError(format!("CSV record error: {}", e)))?;

        let raw_close = field(&record, close_col)?;
        if raw_close.is_empty() {
            continue;
        }
        let date = parse_date(field(&record, date_col)?)?;
        let close = parse_decimal(raw_close, "close")?;
        points.push(PricePoint::new(date, close));
    }

    tracing::debug!(path = %path.display(), rows = points.len(), "Loaded closes from CSV");
    Ok(PriceSeries::new(symbol, points))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

pub(crate) fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(format!(
            "CSV file not found: {}",
            path.display()
        )));
    }
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::ParseError(format!("Failed to open CSV: {}", e)))
}

pub(crate) fn field<'r>(record: &'r csv::StringRecord, index: usize) -> Result<&'r str, DataError> {
    record.get(index).ok_or_else(|| {
        DataError::ParseError(format!(
            "Row {} has no column {}",
            record.position().map(|p| p.line()).unwrap_or_default(),
            index
        ))
    })
}

pub(crate) fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    for (i, header) in headers.iter().enumerate() {
        let h = header.trim().to_lowercase();
        for name in names {
            if h == *name {
                return Some(i);
            }
        }
    }
    None
}

pub(crate) fn parse_decimal(s: &str, field: &str) -> Result<Decimal, DataError> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|e| DataError::ParseError(format!("Failed to parse {} '{}': {}", field, s, e)))
}

/// Parse a trading date. Timestamps are truncated to their calendar date.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, DataError> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    // RFC 3339 / ISO 8601 with offset: keep the local calendar date
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.date_naive());
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y%m%d %H:%M:%S",
    ];
    for fmt in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.date());
        }
    }

    for fmt in ["%m/%d/%Y", "%Y%m%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(DataError::ParseError(format!("Unable to parse date: '{}'", s)))
}

#[cfg(test)]
pub(crate) fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("fxta-data-{}-{}", std::process::id(), name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_load_closes_flexible_columns() {
        let path = temp_path("closes.csv");
        std::fs::write(
            &path,
            "Date,Open,High,Low,Close,Volume\n\
             2023-01-03,89.1,89.5,88.9,89.2,0\n\
             2023-01-02,88.7,89.2,88.5,88.9,0\n\
             2023-01-04,89.3,89.9,89.0,,0\n\
             2023-01-05,89.4,89.8,89.1,89.6,0\n",
        )
        .unwrap();

        let series = load_closes_from_csv(&path, "EURINR=X").unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(series.symbol, "EURINR=X");
        assert_eq!(series.len(), 3);
        let closes: Vec<Decimal> = series.points().iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![dec!(88.9), dec!(89.2), dec!(89.6)]);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_closes_from_csv(Path::new("/nonexistent/closes.csv"), "X").unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
    }

    #[test]
    fn test_missing_close_column() {
        let path = temp_path("no_close.csv");
        std::fs::write(&path, "date,open\n2023-01-02,1\n").unwrap();
        let err = load_closes_from_csv(&path, "X").unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, DataError::ParseError(msg) if msg.contains("close")));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        assert_eq!(parse_date("2023-01-02").unwrap(), expected);
        assert_eq!(parse_date("2023-01-02 00:00:00+00:00").unwrap(), expected);
        assert_eq!(parse_date("2023-01-02T00:00:00Z").unwrap(), expected);
        assert_eq!(parse_date("01/02/2023").unwrap(), expected);
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_parse_decimal_accepts_scientific() {
        assert_eq!(parse_decimal("1.5e2", "close").unwrap(), dec!(150));
        assert!(parse_decimal("abc", "close").is_err());
    }
}
