use crate::config::ConfigError;
use crate::fees::FeeError;
use crate::orchestration::AnalysisError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Fee table error: {0}")]
    Fees(#[from] FeeError),
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),
    #[error("No cost logs given (pass paths as arguments or set COST_LOG_FILES)")]
    NoInput,
}
