pub mod analysis;
pub mod pipeline;

pub use analysis::{compute_indicators, AnalysisError, IndicatorSettings};
pub use pipeline::{decide_saved, run_analysis, run_with_settings, AnalysisReport, PipelineError};
