pub mod plots;

use fxta_core::{ma_column, AnalysisFrame, OutputConfig};
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Errors raised while rendering a chart.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Failed to create chart directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Render error: {0}")]
    Render(String),
    #[error("Column '{0}' is missing from the analysis frame")]
    MissingColumn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    MovingAverage,
    BollingerBands,
    Cci,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChartKind::MovingAverage => "moving average",
            ChartKind::BollingerBands => "bollinger bands",
            ChartKind::Cci => "cci",
        };
        f.write_str(s)
    }
}

/// Which columns to draw and where to write each image.
#[derive(Debug, Clone)]
pub struct ChartLayout {
    pub short_ma_window: usize,
    pub week_ma_window: usize,
    pub bollinger_window: usize,
    pub moving_average_path: PathBuf,
    pub bollinger_path: PathBuf,
    pub cci_path: PathBuf,
}

impl ChartLayout {
    pub fn new(
        output: &OutputConfig,
        short_ma_window: usize,
        week_ma_window: usize,
        bollinger_window: usize,
    ) -> Self {
        Self {
            short_ma_window,
            week_ma_window,
            bollinger_window,
            moving_average_path: output.moving_average_chart_path(),
            bollinger_path: output.bollinger_chart_path(),
            cci_path: output.cci_chart_path(),
        }
    }
}

/// Result of rendering one chart.
#[derive(Debug)]
pub struct ChartOutcome {
    pub kind: ChartKind,
    pub path: PathBuf,
    pub result: Result<(), ChartError>,
}

impl ChartOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

fn ma_label(window: usize) -> String {
    match window {
        7 => "1-Week MA".to_string(),
        w => format!("{}-Day MA", w),
    }
}

/// Render all three charts. A failure in one does not stop the others.
pub fn render_all(frame: &AnalysisFrame, layout: &ChartLayout) -> Vec<ChartOutcome> {
    let short = ma_column(layout.short_ma_window);
    let week = ma_column(layout.week_ma_window);
    let mid = ma_column(layout.bollinger_window);

    let jobs: [(ChartKind, &PathBuf); 3] = [
        (ChartKind::MovingAverage, &layout.moving_average_path),
        (ChartKind::BollingerBands, &layout.bollinger_path),
        (ChartKind::Cci, &layout.cci_path),
    ];

    jobs.into_iter()
        .map(|(kind, path)| {
            let result = match kind {
                ChartKind::MovingAverage => plots::plot_moving_average(
                    frame,
                    path,
                    &[
                        (short.as_str(), ma_label(layout.short_ma_window)),
                        (week.as_str(), ma_label(layout.week_ma_window)),
                    ],
                ),
                ChartKind::BollingerBands => plots::plot_bollinger_bands(
                    frame,
                    path,
                    &mid,
                    layout.bollinger_window,
                ),
                ChartKind::Cci => plots::plot_cci(frame, path),
            };
            match &result {
                Ok(()) => info!(chart = %kind, path = %path.display(), "Chart written"),
                Err(e) => warn!(chart = %kind, path = %path.display(), error = %e, "Chart failed"),
            }
            ChartOutcome {
                kind,
                path: path.clone(),
                result,
            }
        })
        .collect()
}
