use crate::csv_loader::{field, find_column, open_reader, parse_date, parse_decimal};
use fxta_core::{AnalysisFrame, DataError, PricePoint, PriceSeries, CLOSE_COLUMN};
use rust_decimal::Decimal;
use std::path::Path;

/// Write the augmented series as a flat CSV file.
///
/// Header is `Date,Close,<indicator columns>`, one row per date. A missing
/// indicator value is written as an empty field. Returns the number of rows written.
pub fn write_analysis_csv(frame: &AnalysisFrame, path: &Path) -> Result<usize, DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer =
        csv::Writer::from_path(path).map_err(|e| write_error("Failed to create CSV", e))?;

    writer
        .write_record(frame.header())
        .map_err(|e| write_error("Failed to write header", e))?;

    for row in frame.rows() {
        let mut record = Vec::with_capacity(frame.columns().len() + 2);
        record.push(row.date().format("%Y-%m-%d").to_string());
        record.push(row.close().to_string());
        record.extend(
            row.indicator_values()
                .map(|(_, v)| v.map(|d| d.to_string()).unwrap_or_default()),
        );
        writer
            .write_record(&record)
            .map_err(|e| write_error("Failed to write row", e))?;
    }

    writer.flush()?;
    tracing::debug!(path = %path.display(), rows = frame.len(), "Wrote analysis CSV");
    Ok(frame.len())
}

/// I/O failures keep their `io::Error`; anything else is a record problem.
fn write_error(context: &str, e: csv::Error) -> DataError {
    if !e.is_io_error() {
        return DataError::ParseError(format!("{}: {}", context, e));
    }
    match e.into_kind() {
        csv::ErrorKind::Io(io) => DataError::IoError(io),
        other => DataError::ParseError(format!("{}: {:?}", context, other)),
    }
}

/// Read a file produced by [`write_analysis_csv`] back into a frame.
///
/// Every column after `Date` and `Close` becomes an indicator column; empty
/// fields become "no value".
pub fn read_analysis_csv(path: &Path, symbol: &str) -> Result<AnalysisFrame, DataError> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|e| DataError::ParseError(format!("Failed to read headers: {}", e)))?
        .clone();

    let date_col = find_column(&headers, &["date"])
        .ok_or_else(|| DataError::ParseError("No Date column found".into()))?;
    let close_col = find_column(&headers, &["close"])
        .ok_or_else(|| DataError::ParseError("No Close column found".into()))?;
    let indicator_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_col && *i != close_col)
        .map(|(i, name)| (i, name.to_string()))
        .collect();

    let mut points = Vec::new();
    let mut values: Vec<Vec<Option<Decimal>>> = vec![Vec::new(); indicator_cols.len()];
    for result in reader.records() {
        let record =
            result.map_err(|e| DataError::ParseError(format!("CSV record error: {}", e)))?;
        let date = parse_date(field(&record, date_col)?)?;
        let close = parse_decimal(field(&record, close_col)?, CLOSE_COLUMN)?;
        if let Some(prev) = points.last().map(|p: &PricePoint| p.date) {
            if date <= prev {
                return Err(DataError::ParseError(format!(
                    "Results file is not strictly ordered by date at {}",
                    date
                )));
            }
        }
        points.push(PricePoint::new(date, close));

        for ((col, name), column) in indicator_cols.iter().zip(values.iter_mut()) {
            let raw = record.get(*col).unwrap_or("").trim();
            let value = if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
                None
            } else {
                Some(parse_decimal(raw, name)?)
            };
            column.push(value);
        }
    }

    let series = PriceSeries::new(symbol, points);
    let mut frame = AnalysisFrame::from_series(&series);
    for ((_, name), column) in indicator_cols.into_iter().zip(values) {
        frame
            .insert_column(name, column)
            .map_err(|e| DataError::ParseError(e.to_string()))?;
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_loader::temp_path;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample_frame() -> AnalysisFrame {
        let points = (1..=4)
            .map(|d| {
                PricePoint::new(
                    NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                    Decimal::from(d) + dec!(0.125),
                )
            })
            .collect();
        let mut frame = AnalysisFrame::from_series(&PriceSeries::new("EURINR=X", points));
        frame
            .insert_column("MA_1", vec![Some(dec!(1.125)), Some(dec!(2.125)), Some(dec!(3.125)), Some(dec!(4.125))])
            .unwrap();
        frame
            .insert_column("MA_3", vec![None, None, Some(dec!(2.125)), Some(dec!(3.125))])
            .unwrap();
        frame
            .insert_column("CCI", vec![None, None, None, Some(dec!(-66.6666666666666666666666667))])
            .unwrap();
        frame
    }

    #[test]
    fn test_round_trip_preserves_values_and_gaps() {
        let frame = sample_frame();
        let path = temp_path("round_trip.csv");

        let rows = write_analysis_csv(&frame, &path).unwrap();
        assert_eq!(rows, 4);
        let loaded = read_analysis_csv(&path, "EURINR=X").unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, frame);
    }

    #[test]
    fn test_header_and_empty_fields() {
        let frame = sample_frame();
        let path = temp_path("header.csv");
        write_analysis_csv(&frame, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Date,Close,MA_1,MA_3,CCI"));
        assert_eq!(lines.next(), Some("2024-03-01,1.125,1.125,,"));
    }

    #[test]
    fn test_creates_output_directory() {
        let dir = temp_path("nested-out");
        let path = dir.join("results.csv");
        write_analysis_csv(&sample_frame(), &path).unwrap();
        assert!(path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unwritable_target_is_io_error() {
        let dir = temp_path("target-is-dir");
        std::fs::create_dir_all(&dir).unwrap();
        let err = write_analysis_csv(&sample_frame(), &dir).unwrap_err();
        std::fs::remove_dir_all(&dir).ok();
        assert!(matches!(err, DataError::IoError(_)), "{:?}", err);
    }

    #[test]
    fn test_nan_marker_reads_as_missing() {
        let path = temp_path("nan.csv");
        std::fs::write(&path, "Date,Close,CCI\n2024-03-01,1.5,NaN\n2024-03-02,1.6,12.5\n").unwrap();
        let frame = read_analysis_csv(&path, "X").unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(frame.column("CCI").unwrap(), &[None, Some(dec!(12.5))]);
    }
}
