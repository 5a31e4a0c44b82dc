//! Error types for trialscope

use thiserror::Error;

/// Errors that can occur during trial analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid outcome value: {0}")]
    InvalidOutcome(String),

    #[error("Invalid bin size: {0} (must be at least 1)")]
    InvalidBinSize(u32),

    #[error("Failed to parse trial rows: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),
}
