//! Report assembly
//!
//! Builds the data artifacts the charting collaborators consume: per-subject
//! summary series with date markers, the pooled score distribution, and the
//! versioned report payload that wraps them. No rendering happens here.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::Bucketing;
use crate::error::AnalysisError;
use crate::types::{Aggregation, DetailRow, GroupSummary, Outcome, ALL_OUTCOMES};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata embedded in every report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    /// Unique id of the analysis run that produced the report
    pub run_id: String,
}

/// First occurrence of a date within a subject's summary series. Session
/// charts draw a dashed marker at each of these row positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateMarker {
    /// Row index within the subject's series
    pub index: usize,
    pub date: NaiveDate,
}

/// One subject's summary rows, in group first-occurrence order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSeries {
    pub subject_id: String,
    pub rows: Vec<GroupSummary>,
    /// Present only for session-bucketed runs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub date_markers: Vec<DateMarker>,
}

/// Total count of one outcome category for one subject, summed across all
/// groups. Feeds the per-subject outcome-distribution bar chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistributionRow {
    pub subject_id: String,
    pub outcome: Outcome,
    pub count: u32,
}

/// Complete report payload for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub bucketing: Bucketing,
    /// Label downstream charts put on the x axis for this bucketing
    pub x_axis_label: String,
    pub subjects: Vec<SubjectSeries>,
    pub score_distribution: Vec<ScoreDistributionRow>,
}

impl AnalysisReport {
    /// Whether the run produced nothing to display
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// Sum detail-table counts into per-(subject, outcome) totals.
///
/// Subjects appear in first-occurrence order of the detail table; outcomes
/// in canonical order within a subject. Categories a subject never produced
/// are omitted, matching the detail table itself.
pub fn score_distribution(detail: &[DetailRow]) -> Vec<ScoreDistributionRow> {
    let mut subjects: Vec<&str> = Vec::new();
    for row in detail {
        let subject = row.key.subject_id();
        if !subjects.contains(&subject) {
            subjects.push(subject);
        }
    }

    let mut totals = Vec::new();
    for subject in subjects {
        for outcome in ALL_OUTCOMES {
            let count: u32 = detail
                .iter()
                .filter(|row| row.key.subject_id() == subject && row.outcome == outcome)
                .map(|row| row.count)
                .sum();
            if count > 0 {
                totals.push(ScoreDistributionRow {
                    subject_id: subject.to_string(),
                    outcome,
                    count,
                });
            }
        }
    }
    totals
}

/// Row indices where a date appears for the first time in a summary series.
///
/// Only keys that carry a date (session bucketing) produce markers.
pub fn date_markers(rows: &[GroupSummary]) -> Vec<DateMarker> {
    let mut seen: Vec<NaiveDate> = Vec::new();
    let mut markers = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if let Some(date) = row.key.date() {
            if !seen.contains(&date) {
                seen.push(date);
                markers.push(DateMarker { index, date });
            }
        }
    }
    markers
}

/// Assembles [`AnalysisReport`] payloads for aggregation results
pub struct ReportEncoder {
    run_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create an encoder with a fresh run id
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a caller-supplied run id
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    /// Build the report payload for one aggregation result
    pub fn encode(&self, aggregation: &Aggregation, bucketing: Bucketing) -> AnalysisReport {
        let subjects = aggregation
            .subjects()
            .into_iter()
            .map(|subject| {
                let rows: Vec<GroupSummary> = aggregation
                    .summary
                    .iter()
                    .filter(|row| row.key.subject_id() == subject)
                    .cloned()
                    .collect();
                let markers = date_markers(&rows);
                SubjectSeries {
                    subject_id: subject.to_string(),
                    rows,
                    date_markers: markers,
                }
            })
            .collect();

        AnalysisReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                run_id: self.run_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            bucketing,
            x_axis_label: bucketing.x_axis_label(),
            subjects,
            score_distribution: score_distribution(&aggregation.detail),
        }
    }

    /// Encode to pretty-printed JSON
    pub fn encode_to_json(
        &self,
        aggregation: &Aggregation,
        bucketing: Bucketing,
    ) -> Result<String, AnalysisError> {
        let report = self.encode(aggregation, bucketing);
        serde_json::to_string_pretty(&report).map_err(AnalysisError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AggregationEngine;
    use crate::types::TrialRecord;
    use pretty_assertions::assert_eq;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn sample_trials() -> Vec<TrialRecord> {
        let mut trials = Vec::new();
        // rex: two sessions on day 11, one on day 12
        for session in ["1", "2"] {
            trials.push(TrialRecord::new("rex", date(11), session, Outcome::Hit));
            trials.push(TrialRecord::new("rex", date(11), session, Outcome::Miss));
            trials.push(TrialRecord::new("rex", date(11), session, Outcome::Cr));
        }
        trials.push(TrialRecord::new("rex", date(12), "1", Outcome::Fa));
        trials.push(TrialRecord::new("rex", date(12), "1", Outcome::Hit));
        // luna: one session
        trials.push(TrialRecord::new("luna", date(11), "1", Outcome::Hit));
        trials.push(TrialRecord::new("luna", date(11), "1", Outcome::Cr));
        trials
    }

    #[test]
    fn test_score_distribution_sums_across_groups() {
        let agg =
            AggregationEngine::aggregate(&sample_trials(), Bucketing::BySession).unwrap();
        let dist = score_distribution(&agg.detail);

        // rex first (first occurrence), outcomes in canonical order
        assert_eq!(
            dist,
            vec![
                ScoreDistributionRow {
                    subject_id: "rex".to_string(),
                    outcome: Outcome::Hit,
                    count: 3,
                },
                ScoreDistributionRow {
                    subject_id: "rex".to_string(),
                    outcome: Outcome::Miss,
                    count: 2,
                },
                ScoreDistributionRow {
                    subject_id: "rex".to_string(),
                    outcome: Outcome::Fa,
                    count: 1,
                },
                ScoreDistributionRow {
                    subject_id: "rex".to_string(),
                    outcome: Outcome::Cr,
                    count: 2,
                },
                ScoreDistributionRow {
                    subject_id: "luna".to_string(),
                    outcome: Outcome::Hit,
                    count: 1,
                },
                ScoreDistributionRow {
                    subject_id: "luna".to_string(),
                    outcome: Outcome::Cr,
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_date_markers_first_occurrence_per_date() {
        let agg =
            AggregationEngine::aggregate(&sample_trials(), Bucketing::BySession).unwrap();
        let report = ReportEncoder::with_run_id("run-1").encode(&agg, Bucketing::BySession);

        let rex = &report.subjects[0];
        assert_eq!(rex.subject_id, "rex");
        assert_eq!(rex.rows.len(), 3);
        // Day 11 starts at row 0, day 12 at row 2
        assert_eq!(
            rex.date_markers,
            vec![
                DateMarker {
                    index: 0,
                    date: date(11),
                },
                DateMarker {
                    index: 2,
                    date: date(12),
                },
            ]
        );
    }

    #[test]
    fn test_no_date_markers_for_pooled_and_binned_runs() {
        let trials = sample_trials();
        for bucketing in [Bucketing::Pooled, Bucketing::by_bin_default()] {
            let agg = AggregationEngine::aggregate(&trials, bucketing).unwrap();
            let report = ReportEncoder::new().encode(&agg, bucketing);
            for subject in &report.subjects {
                assert!(subject.date_markers.is_empty());
            }
        }
    }

    #[test]
    fn test_report_metadata() {
        let agg = AggregationEngine::aggregate(&sample_trials(), Bucketing::Pooled).unwrap();
        let report = ReportEncoder::with_run_id("run-42").encode(&agg, Bucketing::Pooled);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, ENGINE_VERSION);
        assert_eq!(report.producer.run_id, "run-42");
        assert_eq!(report.x_axis_label, "");
        assert_eq!(report.subjects.len(), 2);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_empty_aggregation_yields_empty_report() {
        let agg = AggregationEngine::aggregate(&[], Bucketing::BySession).unwrap();
        let report = ReportEncoder::new().encode(&agg, Bucketing::BySession);

        assert!(report.is_empty());
        assert!(report.subjects.is_empty());
        assert!(report.score_distribution.is_empty());
    }

    #[test]
    fn test_report_json_round_trip() {
        let agg =
            AggregationEngine::aggregate(&sample_trials(), Bucketing::BySession).unwrap();
        let report = ReportEncoder::with_run_id("run-rt").encode(&agg, Bucketing::BySession);

        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_fresh_encoders_get_distinct_run_ids() {
        let agg = AggregationEngine::aggregate(&sample_trials(), Bucketing::Pooled).unwrap();
        let a = ReportEncoder::new().encode(&agg, Bucketing::Pooled);
        let b = ReportEncoder::new().encode(&agg, Bucketing::Pooled);
        assert_ne!(a.producer.run_id, b.producer.run_id);
    }
}
