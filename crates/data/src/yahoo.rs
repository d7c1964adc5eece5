use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use fxta_core::{ensure_not_empty, DataError, PricePoint, PriceProvider, PriceSeries};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Daily closes from the Yahoo Finance v8 chart endpoint.
#[derive(Debug, Clone)]
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    /// Build a provider whose requests give up after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| DataError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize, Debug)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: Option<String>,
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize, Debug)]
struct ChartIndicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Turn a decoded chart response into a series. Null closes are dropped.
fn series_from_chart(symbol: &str, response: ChartResponse) -> Result<PriceSeries, DataError> {
    if let Some(err) = response.chart.error {
        let code = err.code.unwrap_or_else(|| "error".to_string());
        return Err(DataError::ApiError(format!("{}: {}", code, err.description)));
    }

    let result = response
        .chart
        .result
        .and_then(|mut r| r.pop())
        .ok_or_else(|| DataError::NotFound(format!("no chart result for {}", symbol)))?;

    let offset = result.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let closes = result
        .indicators
        .quote
        .first()
        .map(|q| q.close.as_slice())
        .ok_or_else(|| DataError::ParseError("No quote data".into()))?;

    let mut points = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(close) = closes.get(i).copied().flatten() else {
            continue;
        };
        let date = DateTime::from_timestamp(ts + offset, 0)
            .ok_or_else(|| DataError::ParseError(format!("Invalid timestamp: {}", ts)))?
            .date_naive();
        let close = Decimal::try_from(close)
            .map_err(|e| DataError::ParseError(format!("Invalid close {}: {}", close, e)))?
            .normalize();
        points.push(PricePoint::new(date, close));
    }

    Ok(PriceSeries::new(symbol, points))
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

#[async_trait]
impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let period1 = unix_midnight(start).to_string();
        let period2 = unix_midnight(end).to_string();

        tracing::debug!(%url, %start, %end, "Requesting daily chart");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
                ("events", "history"),
            ])
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = resp.status();
        // Yahoo reports unknown symbols as 404 with a JSON error body.
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::Network(format!("HTTP {}", status)));
        }

        let body: ChartResponse = resp
            .json()
            .await
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let series = series_from_chart(symbol, body)?.within(start, end);
        tracing::info!(symbol, rows = series.len(), "Fetched closes from Yahoo");
        ensure_not_empty(series, start, end)
    }
}
