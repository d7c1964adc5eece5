use crate::analysis::{compute_indicators, AnalysisError, IndicatorSettings};
use fxta_charts::{render_all, ChartLayout, ChartOutcome};
use fxta_core::*;
use fxta_data::{read_analysis_csv, write_analysis_csv};
use fxta_signals::{make_decision, DecisionError, DecisionRules};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A pipeline failure, tagged with the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("data retrieval failed")]
    Data(#[source] DataError),
    #[error("indicator computation failed")]
    Analysis(#[from] AnalysisError),
    #[error("decision failed")]
    Decision(#[from] DecisionError),
    #[error("result export failed")]
    Export(#[source] DataError),
}

/// Everything one run produced.
#[derive(Debug)]
pub struct AnalysisReport {
    pub frame: AnalysisFrame,
    pub decisions: DecisionMap,
    pub charts: Vec<ChartOutcome>,
    pub results_csv: PathBuf,
    pub rows_written: usize,
}

/// Run the reference analysis: fetch, indicators, decisions, charts, CSV.
pub async fn run_analysis(
    provider: &dyn PriceProvider,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, PipelineError> {
    run_with_settings(provider, config, &IndicatorSettings::default()).await
}

/// Same as [`run_analysis`] with explicit indicator windows.
///
/// Decisions are made before anything is written, so a short or incomplete
/// series leaves no output files behind. Chart failures are logged and
/// reported; a CSV failure aborts the run.
pub async fn run_with_settings(
    provider: &dyn PriceProvider,
    config: &AnalysisConfig,
    settings: &IndicatorSettings,
) -> Result<AnalysisReport, PipelineError> {
    info!(
        symbol = %config.symbol,
        start = %config.start_date,
        end = %config.end_date,
        provider = provider.name(),
        "Starting analysis"
    );

    let series = provider
        .fetch_closes(&config.symbol, config.start_date, config.end_date)
        .await
        .map_err(PipelineError::Data)?;

    let frame = compute_indicators(&series, settings)?;
    let decisions = make_decision(&frame, &settings.decision_rules())?;

    let layout = ChartLayout::new(
        &config.output,
        settings.short_ma_window,
        settings.week_ma_window,
        settings.bollinger_window,
    );
    let charts = render_all(&frame, &layout);
    let failed = charts.iter().filter(|c| !c.is_ok()).count();
    if failed > 0 {
        warn!(failed, "Some charts could not be written");
    }

    let results_csv = config.output.results_csv_path();
    let rows_written = write_analysis_csv(&frame, &results_csv).map_err(PipelineError::Export)?;

    info!(
        symbol = %frame.symbol,
        rows = rows_written,
        path = %results_csv.display(),
        "Analysis complete"
    );

    Ok(AnalysisReport {
        frame,
        decisions,
        charts,
        results_csv,
        rows_written,
    })
}

/// Reload a saved results file and decide again from its last row.
pub fn decide_saved(
    path: &Path,
    symbol: &str,
    rules: &DecisionRules,
) -> Result<(AnalysisFrame, DecisionMap), PipelineError> {
    let frame = read_analysis_csv(path, symbol).map_err(PipelineError::Data)?;
    let decisions = make_decision(&frame, rules)?;
    Ok((frame, decisions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Days, NaiveDate};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct StaticProvider {
        closes: Vec<Decimal>,
    }

    #[async_trait]
    impl PriceProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch_closes(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<PriceSeries, DataError> {
            let points = self
                .closes
                .iter()
                .enumerate()
                .map(|(i, c)| PricePoint::new(start + Days::new(i as u64), *c))
                .collect();
            ensure_not_empty(PriceSeries::new(symbol, points).within(start, end), start, end)
        }
    }

    fn config(name: &str) -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        config.end_date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        config.output.directory =
            std::env::temp_dir().join(format!("fxta-pipeline-{}-{}", std::process::id(), name));
        config
    }

    fn spike() -> Vec<Decimal> {
        let mut closes: Vec<Decimal> = (0..24)
            .map(|i| if i % 2 == 0 { dec!(10.0) } else { dec!(10.2) })
            .collect();
        closes.push(dec!(14.0));
        closes
    }

    #[tokio::test]
    async fn test_full_run_writes_outputs() {
        let config = config("full");
        let provider = StaticProvider { closes: spike() };
        let report = run_analysis(&provider, &config).await.unwrap();

        assert_eq!(report.rows_written, 25);
        assert_eq!(report.decisions[&IndicatorKind::Cci], Signal::Sell);
        assert_eq!(report.decisions[&IndicatorKind::BollingerBands], Signal::Sell);
        assert_eq!(report.charts.len(), 3);
        assert!(report.charts.iter().all(|c| c.is_ok() && c.path.exists()));

        let saved = std::fs::read_to_string(&report.results_csv).unwrap();
        assert!(saved.starts_with("Date,Close,MA_1,MA_7,MA_20,BB_upper,BB_lower,CCI\n"));

        let (reloaded, decisions) =
            decide_saved(&report.results_csv, &config.symbol, &DecisionRules::default()).unwrap();
        assert_eq!(reloaded, report.frame);
        assert_eq!(decisions, report.decisions);

        std::fs::remove_dir_all(&config.output.directory).ok();
    }

    #[tokio::test]
    async fn test_short_series_writes_nothing() {
        let config = config("short");
        let provider = StaticProvider {
            closes: vec![dec!(10); 19],
        };
        let err = run_analysis(&provider, &config).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Decision(DecisionError::InsufficientHistory { required: 20, available: 19 })
        ));
        assert_eq!(err.to_string(), "decision failed");
        assert!(!config.output.results_csv_path().exists());
        assert!(!config.output.moving_average_chart_path().exists());
    }

    #[tokio::test]
    async fn test_empty_provider_is_data_error() {
        let config = config("empty");
        let provider = StaticProvider { closes: Vec::new() };
        let err = run_analysis(&provider, &config).await.unwrap_err();
        assert!(matches!(err, PipelineError::Data(DataError::NotFound(_))));
        assert_eq!(err.to_string(), "data retrieval failed");
    }

    #[tokio::test]
    async fn test_constant_series_reports_neutral() {
        let config = config("constant");
        let provider = StaticProvider {
            closes: vec![dec!(10.0); 25],
        };
        let report = run_analysis(&provider, &config).await.unwrap();
        assert!(report.decisions.values().all(|s| *s == Signal::Neutral));
        assert!(report.frame.column(CCI_COLUMN).unwrap().iter().all(Option::is_none));
        std::fs::remove_dir_all(&config.output.directory).ok();
    }

    #[test]
    fn test_missing_saved_file_is_data_error() {
        let path = std::env::temp_dir().join("fxta-pipeline-does-not-exist.csv");
        let err = decide_saved(&path, "EURINR=X", &DecisionRules::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Data(DataError::NotFound(_))));
    }
}
