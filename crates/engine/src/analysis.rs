use fxta_core::*;
use fxta_indicators::bollinger::BollingerBands;
use fxta_indicators::cci::{typical_price, Cci, CciValue};
use fxta_indicators::sma::rolling_mean;
use fxta_signals::DecisionRules;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors raised while adding indicator columns.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid window: {0} (must be > 0)")]
    InvalidWindow(usize),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Indicator windows for a run.
///
/// `Default` is the reference configuration (MA 1 and 7, Bollinger 20/2, CCI 20);
/// the CLI never changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    pub short_ma_window: usize,
    pub week_ma_window: usize,
    pub bollinger_window: usize,
    pub bollinger_num_std: Decimal,
    pub cci_window: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            short_ma_window: 1,
            week_ma_window: 7,
            bollinger_window: 20,
            bollinger_num_std: Decimal::TWO,
            cci_window: 20,
        }
    }
}

impl IndicatorSettings {
    /// Observations needed before every column is defined on the last row.
    pub fn required_history(&self) -> usize {
        [
            self.short_ma_window,
            self.week_ma_window,
            self.bollinger_window,
            self.cci_window,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }

    pub fn decision_rules(&self) -> DecisionRules {
        DecisionRules::new(self.short_ma_window, self.required_history())
            .with_cci_window(self.cci_window)
    }
}

fn check_window(window: usize) -> Result<(), AnalysisError> {
    if window == 0 {
        return Err(AnalysisError::InvalidWindow(window));
    }
    Ok(())
}

/// Add `MA_<window>`: trailing mean of the close, current day included.
pub fn calculate_moving_average(
    frame: &mut AnalysisFrame,
    window: usize,
) -> Result<(), AnalysisError> {
    check_window(window)?;
    let values = rolling_mean(frame.closes(), window);
    frame.insert_column(ma_column(window), values)?;
    Ok(())
}

/// Add `MA_<window>`, `BB_upper` and `BB_lower`.
pub fn calculate_bollinger_bands(
    frame: &mut AnalysisFrame,
    window: usize,
    num_std: Decimal,
) -> Result<(), AnalysisError> {
    check_window(window)?;
    let mut bands = BollingerBands::new(window, num_std);
    let outputs: Vec<_> = frame
        .closes()
        .iter()
        .map(|close| bands.next_output(*close))
        .collect();

    let middle = rolling_mean(frame.closes(), window);
    frame.insert_column(ma_column(window), middle)?;
    frame.insert_column(BB_UPPER_COLUMN, outputs.iter().map(|o| o.map(|b| b.upper)).collect())?;
    frame.insert_column(BB_LOWER_COLUMN, outputs.iter().map(|o| o.map(|b| b.lower)).collect())?;
    Ok(())
}

/// Add `CCI`, using the close as high, low and close of the typical price.
///
/// Windows with zero mean deviation produce no value.
pub fn calculate_cci(frame: &mut AnalysisFrame, window: usize) -> Result<(), AnalysisError> {
    check_window(window)?;
    let mut cci = Cci::new(window);
    let mut degenerate = 0usize;
    let values: Vec<Option<Decimal>> = frame
        .closes()
        .iter()
        .map(|close| {
            let tp = typical_price(*close, *close, *close);
            let out = cci.next_value(tp);
            if out == CciValue::Degenerate {
                degenerate += 1;
            }
            out.value()
        })
        .collect();

    if degenerate > 0 {
        debug!(window, rows = degenerate, "CCI undefined where mean deviation is zero");
    }
    frame.insert_column(CCI_COLUMN, values)?;
    Ok(())
}

/// Build the augmented frame for `series` with every configured indicator.
pub fn compute_indicators(
    series: &PriceSeries,
    settings: &IndicatorSettings,
) -> Result<AnalysisFrame, AnalysisError> {
    let mut frame = AnalysisFrame::from_series(series);
    calculate_moving_average(&mut frame, settings.short_ma_window)?;
    calculate_moving_average(&mut frame, settings.week_ma_window)?;
    calculate_bollinger_bands(&mut frame, settings.bollinger_window, settings.bollinger_num_std)?;
    calculate_cci(&mut frame, settings.cci_window)?;

    for column in frame.columns() {
        debug!(column = %column.name, defined = column.defined_count(), "Indicator column");
    }
    debug!(
        symbol = %frame.symbol,
        rows = frame.len(),
        columns = frame.columns().len(),
        "Indicators computed"
    );
    Ok(frame)
}
