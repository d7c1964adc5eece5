use crate::models::*;
use async_trait::async_trait;
use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Price Provider Trait
// ---------------------------------------------------------------------------

/// Errors that can occur while loading or persisting price data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Data not found: {0}")]
    NotFound(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    ApiError(String),
}

/// Supplies daily closing prices for a symbol.
///
/// Implementations must return `DataError::NotFound` rather than an empty
/// series when nothing falls inside the requested range.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Load daily closes for `symbol` over the half-open range `[start, end)`.
    async fn fetch_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError>;
}

/// Reject an empty series with a diagnosable message.
pub fn ensure_not_empty(
    series: PriceSeries,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceSeries, DataError> {
    if series.is_empty() {
        return Err(DataError::NotFound(format!(
            "no closes for {} between {} and {}",
            series.symbol, start, end
        )));
    }
    Ok(series)
}
