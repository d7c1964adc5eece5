use chrono::NaiveDate;
use fxta_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Errors that stop a decision from being made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    #[error("Price series is empty")]
    EmptySeries,
    #[error("Insufficient history: {required} observations required, {available} available")]
    InsufficientHistory { required: usize, available: usize },
    #[error("Column '{0}' is missing from the analysis frame")]
    UnknownColumn(String),
    #[error("No value for '{column}' on {date}")]
    MissingValue { column: String, date: NaiveDate },
    #[error(transparent)]
    Frame(FrameError),
}

impl From<FrameError> for DecisionError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::UnknownColumn(name) => DecisionError::UnknownColumn(name),
            other => DecisionError::Frame(other),
        }
    }
}

/// Thresholds and column bindings for the decision rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRules {
    /// Moving-average column compared against the close.
    pub short_ma_column: String,
    /// Observations needed before every indicator on the last row is defined.
    pub required_history: usize,
    /// CCI window. A missing CCI on a frame at least this long is a flat
    /// window (NEUTRAL); on a shorter frame it is still warming up.
    pub cci_window: usize,
    /// CCI above this is overbought (SELL).
    pub cci_overbought: Decimal,
    /// CCI below this is oversold (BUY).
    pub cci_oversold: Decimal,
}

impl DecisionRules {
    /// Rules for `MA_<short_ma_window>` with a 20-observation CCI window.
    pub fn new(short_ma_window: usize, required_history: usize) -> Self {
        Self {
            short_ma_column: ma_column(short_ma_window),
            required_history,
            cci_window: 20,
            cci_overbought: dec!(100),
            cci_oversold: dec!(-100),
        }
    }

    pub fn with_cci_window(mut self, cci_window: usize) -> Self {
        self.cci_window = cci_window;
        self
    }
}

impl Default for DecisionRules {
    /// MA_1 against the close, 20 observations for the Bollinger and CCI windows.
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// Derive one signal per indicator from the most recent row of `frame`.
///
/// Fails before comparing anything if the frame is too short or a required
/// value is missing. A missing CCI on a frame of at least `cci_window` rows
/// means the window had zero deviation; that case reports NEUTRAL.
pub fn make_decision(
    frame: &AnalysisFrame,
    rules: &DecisionRules,
) -> Result<DecisionMap, DecisionError> {
    let row = frame.last_row().ok_or(DecisionError::EmptySeries)?;
    if frame.len() < rules.required_history {
        return Err(DecisionError::InsufficientHistory {
            required: rules.required_history,
            available: frame.len(),
        });
    }

    let date = row.date();
    let require = |column: &str| -> Result<Decimal, DecisionError> {
        row.value(column)?.ok_or_else(|| DecisionError::MissingValue {
            column: column.to_string(),
            date,
        })
    };

    let close = row.close();
    let short_ma = require(&rules.short_ma_column)?;
    let upper = require(BB_UPPER_COLUMN)?;
    let lower = require(BB_LOWER_COLUMN)?;
    let cci = row.value(CCI_COLUMN)?;

    if cci.is_none() {
        if frame.len() < rules.cci_window {
            return Err(DecisionError::MissingValue {
                column: CCI_COLUMN.to_string(),
                date,
            });
        }
        warn!(%date, "CCI undefined (zero mean deviation), reporting NEUTRAL");
    }

    let mut decisions = DecisionMap::new();
    decisions.insert(IndicatorKind::MovingAverage, moving_average_signal(close, short_ma));
    decisions.insert(IndicatorKind::BollingerBands, bollinger_signal(close, upper, lower));
    decisions.insert(IndicatorKind::Cci, cci_signal(cci, rules));

    debug!(%date, %close, ?decisions, "Decisions made");
    Ok(decisions)
}

/// Close above the short MA is BUY, below is SELL.
pub fn moving_average_signal(close: Decimal, short_ma: Decimal) -> Signal {
    if close > short_ma {
        Signal::Buy
    } else if close < short_ma {
        Signal::Sell
    } else {
        Signal::Neutral
    }
}

/// Close above the upper band is SELL, below the lower band is BUY.
pub fn bollinger_signal(close: Decimal, upper: Decimal, lower: Decimal) -> Signal {
    if close > upper {
        Signal::Sell
    } else if close < lower {
        Signal::Buy
    } else {
        Signal::Neutral
    }
}

pub fn cci_signal(cci: Option<Decimal>, rules: &DecisionRules) -> Signal {
    match cci {
        Some(v) if v > rules.cci_overbought => Signal::Sell,
        Some(v) if v < rules.cci_oversold => Signal::Buy,
        _ => Signal::Neutral,
    }
}
