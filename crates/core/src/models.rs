use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// Header of the date index column in exported files.
pub const DATE_COLUMN: &str = "Date";
/// Closing price column.
pub const CLOSE_COLUMN: &str = "Close";
pub const BB_UPPER_COLUMN: &str = "BB_upper";
pub const BB_LOWER_COLUMN: &str = "BB_lower";
pub const CCI_COLUMN: &str = "CCI";

/// Name of the moving-average column for a window, e.g. `MA_7`.
pub fn ma_column(window: usize) -> String {
    format!("MA_{}", window)
}

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// A single daily close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Decimal,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: Decimal) -> Self {
        Self { date, close }
    }
}

/// Daily closing prices for one instrument, ordered by date.
///
/// Missing market days are simply absent; nothing is forward-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, sorting by date. A repeated date keeps the last close seen.
    pub fn new(symbol: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }
        Self {
            symbol: symbol.into(),
            points: deduped,
        }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Keep only points in the half-open range `[start, end)`.
    pub fn within(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.points.retain(|p| p.date >= start && p.date < end);
        self
    }
}

// ---------------------------------------------------------------------------
// Analysis Frame
// ---------------------------------------------------------------------------

/// Errors raised when manipulating an [`AnalysisFrame`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Column '{name}' has {actual} values but the frame has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("Column '{0}' is reserved")]
    ReservedColumn(String),
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

/// A derived numeric column aligned 1:1 with the frame index. `None` means "no value".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorColumn {
    pub name: String,
    pub values: Vec<Option<Decimal>>,
}

impl IndicatorColumn {
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// The price series augmented with indicator columns.
///
/// Columns keep their insertion order, which is also the export order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFrame {
    pub symbol: String,
    dates: Vec<NaiveDate>,
    close: Vec<Decimal>,
    columns: Vec<IndicatorColumn>,
}

impl AnalysisFrame {
    pub fn from_series(series: &PriceSeries) -> Self {
        Self {
            symbol: series.symbol.clone(),
            dates: series.points().iter().map(|p| p.date).collect(),
            close: series.points().iter().map(|p| p.close).collect(),
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn closes(&self) -> &[Decimal] {
        &self.close
    }

    pub fn columns(&self) -> &[IndicatorColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[Option<Decimal>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Add a column, replacing any existing column with the same name in place.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<Decimal>>,
    ) -> Result<(), FrameError> {
        let name = name.into();
        if name == CLOSE_COLUMN || name == DATE_COLUMN {
            return Err(FrameError::ReservedColumn(name));
        }
        if values.len() != self.len() {
            return Err(FrameError::LengthMismatch {
                name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(IndicatorColumn { name, values }),
        }
        Ok(())
    }

    /// Header row: `Date`, `Close`, then indicator columns.
    pub fn header(&self) -> Vec<&str> {
        let mut header = vec![DATE_COLUMN, CLOSE_COLUMN];
        header.extend(self.columns.iter().map(|c| c.name.as_str()));
        header
    }

    pub fn row(&self, index: usize) -> Option<FrameRow<'_>> {
        (index < self.len()).then_some(FrameRow { frame: self, index })
    }

    pub fn last_row(&self) -> Option<FrameRow<'_>> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }

    pub fn rows(&self) -> impl Iterator<Item = FrameRow<'_>> {
        (0..self.len()).map(move |index| FrameRow { frame: self, index })
    }
}

/// A borrowed view of one row of an [`AnalysisFrame`].
#[derive(Debug, Clone, Copy)]
pub struct FrameRow<'a> {
    frame: &'a AnalysisFrame,
    index: usize,
}

impl<'a> FrameRow<'a> {
    pub fn date(&self) -> NaiveDate {
        self.frame.dates[self.index]
    }

    pub fn close(&self) -> Decimal {
        self.frame.close[self.index]
    }

    /// Value of a named column on this row. `Ok(None)` is "no value".
    pub fn value(&self, name: &str) -> Result<Option<Decimal>, FrameError> {
        if name == CLOSE_COLUMN {
            return Ok(Some(self.close()));
        }
        self.frame
            .column(name)
            .map(|values| values[self.index])
            .ok_or_else(|| FrameError::UnknownColumn(name.to_string()))
    }

    /// Indicator values in column order.
    pub fn indicator_values(&self) -> impl Iterator<Item = (&'a str, Option<Decimal>)> + 'a {
        let index = self.index;
        self.frame
            .columns
            .iter()
            .map(move |c| (c.name.as_str(), c.values[index]))
    }
}

impl fmt::Display for FrameRow<'_> {
    /// Two aligned lines: the header and the values, `NaN` for "no value".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cells: Vec<(String, String)> = vec![
            (DATE_COLUMN.to_string(), self.date().format("%Y-%m-%d").to_string()),
            (CLOSE_COLUMN.to_string(), self.close().to_string()),
        ];
        for (name, value) in self.indicator_values() {
            let text = value
                .map(|v| v.round_dp(6).normalize().to_string())
                .unwrap_or_else(|| "NaN".to_string());
            cells.push((name.to_string(), text));
        }

        let widths: Vec<usize> = cells.iter().map(|(h, v)| h.len().max(v.len())).collect();
        let header: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|((h, _), w)| format!("{:>w$}", h, w = *w))
            .collect();
        let values: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|((_, v), w)| format!("{:>w$}", v, w = *w))
            .collect();
        writeln!(f, "{}", header.join("  "))?;
        write!(f, "{}", values.join("  "))
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// A categorical recommendation for one indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Neutral => "NEUTRAL",
        };
        f.write_str(s)
    }
}

/// The indicators a decision is produced for. Ordering is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    #[serde(rename = "Moving Average")]
    MovingAverage,
    #[serde(rename = "Bollinger Bands")]
    BollingerBands,
    #[serde(rename = "CCI")]
    Cci,
}

impl IndicatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::MovingAverage => "Moving Average",
            IndicatorKind::BollingerBands => "Bollinger Bands",
            IndicatorKind::Cci => "CCI",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One signal per indicator, computed from the most recent row.
pub type DecisionMap = BTreeMap<IndicatorKind, Signal>;
