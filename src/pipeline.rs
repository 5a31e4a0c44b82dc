//! Pipeline orchestration
//!
//! Public entry points tying the stages together: row parsing → aggregation
//! → report encoding. Every run is stateless; the `Analyzer` type only pins
//! a producer run id across calls.

use crate::adapter::TrialRowAdapter;
use crate::engine::{AggregationEngine, Bucketing};
use crate::error::AnalysisError;
use crate::report::{AnalysisReport, ReportEncoder};
use crate::types::TrialRecord;

/// Convert a JSON array of trial rows to a report JSON string (stateless,
/// one-shot).
///
/// # Example
/// ```ignore
/// let report_json = trials_to_report(rows_json, Bucketing::BySession)?;
/// ```
pub fn trials_to_report(rows_json: &str, bucketing: Bucketing) -> Result<String, AnalysisError> {
    // Stage 1: Parse and normalize trial rows
    let trials = TrialRowAdapter::parse_array(rows_json)?;

    // Stage 2: Aggregate under the chosen bucketing
    let aggregation = AggregationEngine::aggregate(&trials, bucketing)?;

    // Stage 3: Encode the report payload
    ReportEncoder::new().encode_to_json(&aggregation, bucketing)
}

/// Analyzer with a stable run id, for callers producing several reports
/// from one logical run. Holds no analysis state between calls.
pub struct Analyzer {
    encoder: ReportEncoder,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Create an analyzer with a fresh run id
    pub fn new() -> Self {
        Self {
            encoder: ReportEncoder::new(),
        }
    }

    /// Create an analyzer with a caller-supplied run id
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            encoder: ReportEncoder::with_run_id(run_id),
        }
    }

    /// Aggregate trials and build the report payload
    pub fn analyze(
        &self,
        trials: &[TrialRecord],
        bucketing: Bucketing,
    ) -> Result<AnalysisReport, AnalysisError> {
        let aggregation = AggregationEngine::aggregate(trials, bucketing)?;
        Ok(self.encoder.encode(&aggregation, bucketing))
    }

    /// Aggregate trials and serialize the report to pretty JSON
    pub fn analyze_to_json(
        &self,
        trials: &[TrialRecord],
        bucketing: Bucketing,
    ) -> Result<String, AnalysisError> {
        let report = self.analyze(trials, bucketing)?;
        serde_json::to_string_pretty(&report).map_err(AnalysisError::JsonError)
    }
}
