pub mod csv_loader;
pub mod results;
pub mod yahoo;

pub use results::{read_analysis_csv, write_analysis_csv};
pub use yahoo::YahooProvider;

use async_trait::async_trait;
use chrono::NaiveDate;
use fxta_core::{ensure_not_empty, DataError, PriceProvider, PriceSeries};
use std::path::PathBuf;

/// A CSV-file-based price provider for offline runs.
pub struct CsvPriceProvider {
    pub path: PathBuf,
}

impl CsvPriceProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PriceProvider for CsvPriceProvider {
    fn name(&self) -> &str {
        "csv"
    }

    async fn fetch_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let series = csv_loader::load_closes_from_csv(&self.path, symbol)?.within(start, end);
        tracing::info!(
            symbol,
            path = %self.path.display(),
            rows = series.len(),
            "Loaded closes from file"
        );
        ensure_not_empty(series, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_loader::temp_path;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_csv_provider_filters_range() {
        let path = temp_path("provider.csv");
        std::fs::write(
            &path,
            "date,close\n2023-12-29,1\n2024-01-02,2\n2024-01-03,3\n2024-01-04,4\n",
        )
        .unwrap();

        let provider = CsvPriceProvider::new(&path);
        let series = provider
            .fetch_closes("X", date(2024, 1, 1), date(2024, 1, 4))
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].date, date(2024, 1, 2));
    }

    #[tokio::test]
    async fn test_csv_provider_empty_range_fails() {
        let path = temp_path("provider_empty.csv");
        std::fs::write(&path, "date,close\n2023-12-29,1\n").unwrap();

        let provider = CsvPriceProvider::new(&path);
        let err = provider
            .fetch_closes("X", date(2024, 1, 1), date(2024, 2, 1))
            .await
            .unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, DataError::NotFound(_)));
    }
}
