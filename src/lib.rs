//! Trialscope - Signal-detection aggregation engine for behavioral trials
//!
//! Trialscope turns scored trial records (HIT / MISS / FA / CR) into
//! per-subject, per-time-bucket performance metrics through a deterministic
//! pipeline: row normalization → bucketing → per-group rate estimation →
//! d-prime derivation → report encoding.
//!
//! ## Modules
//!
//! - **adapter**: Parse normalized trial-row exports into trial records
//! - **engine**: Bucketing strategies and the aggregation pass
//! - **rates**: Clamped hit-rate / false-alarm-rate estimation
//! - **stats**: Inverse normal CDF and the d-prime sensitivity index
//! - **report**: Chart-ready report payloads and score distributions

pub mod adapter;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod rates;
pub mod report;
pub mod stats;
pub mod types;

pub use engine::{AggregationEngine, Bucketing, DEFAULT_BIN_SIZE};
pub use error::AnalysisError;
pub use pipeline::{trials_to_report, Analyzer};
pub use rates::{RateEstimator, RATE_CEILING, RATE_FLOOR};
pub use report::{AnalysisReport, ReportEncoder};
pub use stats::{d_prime, inverse_normal_cdf};
pub use types::{Aggregation, GroupKey, GroupSummary, Outcome, OutcomeCounts, TrialRecord};

/// Engine version embedded in all report payloads
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report payloads
pub const PRODUCER_NAME: &str = "trialscope";
