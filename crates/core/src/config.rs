use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Inputs for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Ticker understood by the price provider (e.g. "EURINR=X").
    pub symbol: String,
    /// First date included.
    pub start_date: NaiveDate,
    /// First date excluded.
    pub end_date: NaiveDate,
    pub output: OutputConfig,
    pub provider: ProviderConfig,
}

/// Where results are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub moving_average_chart: String,
    pub bollinger_chart: String,
    pub cci_chart: String,
    pub results_csv: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Request timeout for the market-data provider.
    pub timeout_secs: u64,
    pub base_url: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            symbol: "EURINR=X".to_string(),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 9, 30).unwrap_or_default(),
            output: OutputConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            moving_average_chart: "moving_average_plot.svg".to_string(),
            bollinger_chart: "bollinger_bands_plot.svg".to_string(),
            cci_chart: "cci_plot.svg".to_string(),
            results_csv: "EURINR_analysis_results.csv".to_string(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            base_url: "https://query1.finance.yahoo.com".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn moving_average_chart_path(&self) -> PathBuf {
        self.directory.join(&self.moving_average_chart)
    }

    pub fn bollinger_chart_path(&self) -> PathBuf {
        self.directory.join(&self.bollinger_chart)
    }

    pub fn cci_chart_path(&self) -> PathBuf {
        self.directory.join(&self.cci_chart)
    }

    pub fn results_csv_path(&self) -> PathBuf {
        self.directory.join(&self.results_csv)
    }
}

impl AnalysisConfig {
    /// Parse a TOML document. Missing keys fall back to defaults.
    ///
    /// Not validated: callers apply their overrides first, then call [`validate`](Self::validate).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load a TOML config file without validating it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), symbol = %config.symbol, "Loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        if self.start_date >= self.end_date {
            return Err(ConfigError::Invalid(format!(
                "start_date {} must be before end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("provider.timeout_secs must be > 0".into()));
        }
        let files = [
            ("output.moving_average_chart", &self.output.moving_average_chart),
            ("output.bollinger_chart", &self.output.bollinger_chart),
            ("output.cci_chart", &self.output.cci_chart),
            ("output.results_csv", &self.output.results_csv),
        ];
        for (key, name) in files {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }
}
