use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use fxta_core::*;
use fxta_data::{CsvPriceProvider, YahooProvider};
use fxta_engine::{decide_saved, run_analysis, AnalysisReport, IndicatorSettings};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "fxta")]
#[command(about = "Daily forex technical analysis: moving averages, Bollinger Bands and CCI")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch prices, compute indicators, decide, and write charts and CSV
    Analyze {
        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Ticker (e.g. "EURINR=X")
        #[arg(short, long, env = "FXTA_SYMBOL")]
        symbol: Option<String>,

        /// First date included (YYYY-MM-DD)
        #[arg(long, env = "FXTA_START")]
        start: Option<NaiveDate>,

        /// First date excluded (YYYY-MM-DD)
        #[arg(long, env = "FXTA_END")]
        end: Option<NaiveDate>,

        /// Read closes from a CSV file instead of Yahoo Finance
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory for the charts and results CSV
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Provider request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reload a saved results CSV and decide again from its last row
    Inspect {
        /// Results CSV written by `analyze`
        #[arg(short, long)]
        file: PathBuf,

        /// Symbol to label the frame with (defaults to the file name)
        #[arg(short, long)]
        symbol: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the indicators and their windows
    Indicators,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Analyze {
            config,
            symbol,
            start,
            end,
            data,
            output_dir,
            timeout_secs,
            json,
        } => {
            let mut config = match config {
                Some(path) => AnalysisConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => AnalysisConfig::default(),
            };
            if let Some(symbol) = symbol {
                config.symbol = symbol;
            }
            if let Some(start) = start {
                config.start_date = start;
            }
            if let Some(end) = end {
                config.end_date = end;
            }
            if let Some(dir) = output_dir {
                config.output.directory = dir;
            }
            if let Some(secs) = timeout_secs {
                config.provider.timeout_secs = secs;
            }
            config.validate().context("invalid configuration")?;

            analyze(&config, data.as_deref(), json).await?;
        }
        Commands::Inspect { file, symbol, json } => {
            inspect(&file, symbol, json)?;
        }
        Commands::Indicators => print_indicators(&IndicatorSettings::default()),
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only the report. `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn analyze(config: &AnalysisConfig, data: Option<&Path>, as_json: bool) -> Result<()> {
    tracing::debug!(?config, "Effective configuration");
    let provider: Box<dyn PriceProvider> = match data {
        Some(path) => Box::new(CsvPriceProvider::new(path)),
        None => Box::new(
            YahooProvider::new(
                config.provider.base_url.as_str(),
                Duration::from_secs(config.provider.timeout_secs),
            )
            .context("creating Yahoo Finance client")?,
        ),
    };

    let report = run_analysis(provider.as_ref(), config)
        .await
        .with_context(|| format!("analysis of {} failed", config.symbol))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn inspect(file: &Path, symbol: Option<String>, as_json: bool) -> Result<()> {
    let symbol = symbol.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let rules = IndicatorSettings::default().decision_rules();
    let (frame, decisions) = decide_saved(file, &symbol, &rules)
        .with_context(|| format!("inspecting {}", file.display()))?;

    if as_json {
        let body = json!({
            "symbol": frame.symbol,
            "file": file.display().to_string(),
            "rows": frame.len(),
            "last_row": frame.last_row().map(|row| row_json(&row)),
            "decisions": decisions,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print_last_row(&frame);
        print_decisions(&decisions);
    }
    Ok(())
}

fn row_json(row: &FrameRow<'_>) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(DATE_COLUMN.into(), json!(row.date()));
    map.insert(CLOSE_COLUMN.into(), json!(row.close()));
    for (name, value) in row.indicator_values() {
        map.insert(name.into(), json!(value));
    }
    serde_json::Value::Object(map)
}

fn report_json(report: &AnalysisReport) -> serde_json::Value {
    let charts: Vec<_> = report
        .charts
        .iter()
        .map(|c| {
            json!({
                "chart": c.kind.to_string(),
                "path": c.path.display().to_string(),
                "error": c.result.as_ref().err().map(|e| e.to_string()),
            })
        })
        .collect();
    json!({
        "symbol": report.frame.symbol,
        "rows": report.rows_written,
        "results_csv": report.results_csv.display().to_string(),
        "last_row": report.frame.last_row().map(|row| row_json(&row)),
        "decisions": report.decisions,
        "charts": charts,
    })
}

fn print_indicators(s: &IndicatorSettings) {
    println!("Indicators:");
    println!(
        "  {:<16} windows {} and {} ({}, {})",
        IndicatorKind::MovingAverage.name(),
        s.short_ma_window,
        s.week_ma_window,
        ma_column(s.short_ma_window),
        ma_column(s.week_ma_window)
    );
    println!(
        "  {:<16} window {}, {} sample std devs ({}, {}, {})",
        IndicatorKind::BollingerBands.name(),
        s.bollinger_window,
        s.bollinger_num_std,
        ma_column(s.bollinger_window),
        BB_UPPER_COLUMN,
        BB_LOWER_COLUMN
    );
    println!(
        "  {:<16} window {}, overbought above +100, oversold below -100 ({})",
        IndicatorKind::Cci.name(),
        s.cci_window,
        CCI_COLUMN
    );
}

fn print_last_row(frame: &AnalysisFrame) {
    if let Some(row) = frame.last_row() {
        println!("\n{}\n", row);
    }
}

fn print_decisions(decisions: &DecisionMap) {
    println!("Decisions:");
    for (kind, signal) in decisions {
        println!("  {:<16} {}", kind.name(), signal);
    }
}

fn print_report(report: &AnalysisReport) {
    let sep = "=".repeat(60);
    println!("\n{sep}");
    println!("  ANALYSIS: {}", report.frame.symbol);
    println!("{sep}");
    print_last_row(&report.frame);
    print_decisions(&report.decisions);
    println!();
    for chart in &report.charts {
        match &chart.result {
            Ok(()) => println!("  Chart:   {}", chart.path.display()),
            Err(e) => println!("  Chart:   {} (failed: {})", chart.path.display(), e),
        }
    }
    println!("  Results: {} ({} rows)", report.results_csv.display(), report.rows_written);
    println!("{sep}\n");
}
