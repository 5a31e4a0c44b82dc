//! Core types for the trialscope engine
//!
//! This module defines the data structures that flow through an analysis run:
//! trial records, group keys, per-group outcome counts, and the two output
//! tables (summary and detail).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Scored outcome of one behavioral trial under signal-detection theory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// Signal present, subject responded
    Hit,
    /// Signal present, subject did not respond
    Miss,
    /// No signal, subject responded anyway (false alarm)
    Fa,
    /// No signal, subject correctly withheld (correct rejection)
    Cr,
}

/// The four outcomes in canonical order (signal trials first)
pub const ALL_OUTCOMES: [Outcome; 4] = [Outcome::Hit, Outcome::Miss, Outcome::Fa, Outcome::Cr];

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Hit => "HIT",
            Outcome::Miss => "MISS",
            Outcome::Fa => "FA",
            Outcome::Cr => "CR",
        }
    }

    /// Map a raw outcome token from a source export to a canonical outcome.
    ///
    /// Tokens are case-insensitive. Source sheets spell false alarms as
    /// either `fa` or `fp`. Any other value is a data-quality defect and is
    /// rejected rather than silently aggregated.
    pub fn parse(token: &str) -> Result<Self, AnalysisError> {
        match token.trim().to_ascii_uppercase().as_str() {
            "HIT" => Ok(Outcome::Hit),
            "MISS" => Ok(Outcome::Miss),
            "FA" | "FP" => Ok(Outcome::Fa),
            "CR" => Ok(Outcome::Cr),
            other => Err(AnalysisError::InvalidOutcome(other.to_string())),
        }
    }

    /// Whether a true signal was present on this trial
    pub fn is_signal_trial(&self) -> bool {
        matches!(self, Outcome::Hit | Outcome::Miss)
    }
}

/// One behavioral trial, normalized by the ingestion collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Subject under evaluation
    pub subject_id: String,
    /// Calendar date of the trial
    pub date: NaiveDate,
    /// Session identifier within a date
    pub session_id: String,
    /// Scored outcome
    pub outcome: Outcome,
}

impl TrialRecord {
    pub fn new(
        subject_id: impl Into<String>,
        date: NaiveDate,
        session_id: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            date,
            session_id: session_id.into(),
            outcome,
        }
    }
}

/// Grouping key assigned to a trial by the active bucketing strategy.
///
/// Two trials belong to the same group iff their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupKey {
    /// (subject, date, session), one point per session
    Session {
        subject_id: String,
        date: NaiveDate,
        session_id: String,
    },
    /// (subject, bin index), consecutive fixed-size bins of sorted trials
    Bin { subject_id: String, bin: u32 },
    /// (subject), one pooled point per subject
    Subject { subject_id: String },
}

impl GroupKey {
    /// Subject dimension of the key (present in every strategy)
    pub fn subject_id(&self) -> &str {
        match self {
            GroupKey::Session { subject_id, .. } => subject_id,
            GroupKey::Bin { subject_id, .. } => subject_id,
            GroupKey::Subject { subject_id } => subject_id,
        }
    }

    /// Date dimension, when the key carries one
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            GroupKey::Session { date, .. } => Some(*date),
            _ => None,
        }
    }
}

/// Per-group outcome tallies. All four categories are always present,
/// zero-filled when absent from the group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub hits: u32,
    pub misses: u32,
    pub false_alarms: u32,
    pub correct_rejections: u32,
}

impl OutcomeCounts {
    /// Tally one outcome
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Hit => self.hits += 1,
            Outcome::Miss => self.misses += 1,
            Outcome::Fa => self.false_alarms += 1,
            Outcome::Cr => self.correct_rejections += 1,
        }
    }

    pub fn count(&self, outcome: Outcome) -> u32 {
        match outcome {
            Outcome::Hit => self.hits,
            Outcome::Miss => self.misses,
            Outcome::Fa => self.false_alarms,
            Outcome::Cr => self.correct_rejections,
        }
    }

    /// Trials where a true signal was present
    pub fn signal_trials(&self) -> u32 {
        self.hits + self.misses
    }

    /// Trials where no true signal was present
    pub fn noise_trials(&self) -> u32 {
        self.false_alarms + self.correct_rejections
    }

    pub fn total(&self) -> u32 {
        self.signal_trials() + self.noise_trials()
    }
}

/// One row of the deduplicated summary table: a group's counts, clamped
/// rates, and sensitivity index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub key: GroupKey,
    pub counts: OutcomeCounts,
    /// Clamped hit rate, always in [0.01, 0.99]
    pub hit_rate: f64,
    /// Clamped false-alarm rate, always in [0.01, 0.99]
    pub fa_rate: f64,
    /// Sensitivity index, Φ⁻¹(hit_rate) − Φ⁻¹(fa_rate)
    pub d_prime: f64,
}

/// One row of the detail table: a (group, outcome) pair with its count,
/// prior to deduplication. Consumed by the score-distribution report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRow {
    pub key: GroupKey,
    pub outcome: Outcome,
    pub count: u32,
}

/// Output of one aggregation run: the summary table (one row per distinct
/// group key, in first-occurrence order) and the detail table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub summary: Vec<GroupSummary>,
    pub detail: Vec<DetailRow>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
    }

    /// Distinct subjects in first-occurrence order of the summary table
    pub fn subjects(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for row in &self.summary {
            let subject = row.key.subject_id();
            if !seen.contains(&subject) {
                seen.push(subject);
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&Outcome::Fa).unwrap();
        assert_eq!(json, "\"FA\"");

        let parsed: Outcome = serde_json::from_str("\"MISS\"").unwrap();
        assert_eq!(parsed, Outcome::Miss);
    }

    #[test]
    fn test_outcome_parse_tokens() {
        assert_eq!(Outcome::parse("hit").unwrap(), Outcome::Hit);
        assert_eq!(Outcome::parse("MISS").unwrap(), Outcome::Miss);
        assert_eq!(Outcome::parse("fp").unwrap(), Outcome::Fa);
        assert_eq!(Outcome::parse("FP").unwrap(), Outcome::Fa);
        assert_eq!(Outcome::parse("fa").unwrap(), Outcome::Fa);
        assert_eq!(Outcome::parse(" cr ").unwrap(), Outcome::Cr);
    }

    #[test]
    fn test_outcome_parse_rejects_unknown() {
        let err = Outcome::parse("UNKNOWN").unwrap_err();
        assert!(matches!(
            err,
            crate::error::AnalysisError::InvalidOutcome(ref v) if v == "UNKNOWN"
        ));
    }

    #[test]
    fn test_outcome_counts_record_and_query() {
        let mut counts = OutcomeCounts::default();
        counts.record(Outcome::Hit);
        counts.record(Outcome::Hit);
        counts.record(Outcome::Miss);
        counts.record(Outcome::Cr);

        assert_eq!(counts.count(Outcome::Hit), 2);
        assert_eq!(counts.count(Outcome::Miss), 1);
        assert_eq!(counts.count(Outcome::Fa), 0);
        assert_eq!(counts.signal_trials(), 3);
        assert_eq!(counts.noise_trials(), 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_group_key_equality_by_projection() {
        let a = GroupKey::Session {
            subject_id: "rex".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            session_id: "2".to_string(),
        };
        let b = GroupKey::Session {
            subject_id: "rex".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            session_id: "2".to_string(),
        };
        let c = GroupKey::Session {
            subject_id: "rex".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            session_id: "3".to_string(),
        };

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.subject_id(), "rex");
    }

    #[test]
    fn test_group_key_serialization_is_tagged() {
        let key = GroupKey::Bin {
            subject_id: "luna".to_string(),
            bin: 3,
        };
        let json = serde_json::to_string(&key).unwrap();
        assert!(json.contains("\"kind\":\"bin\""));
        assert!(json.contains("\"bin\":3"));

        let parsed: GroupKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_aggregation_subjects_first_occurrence_order() {
        let row = |subject: &str| GroupSummary {
            key: GroupKey::Subject {
                subject_id: subject.to_string(),
            },
            counts: OutcomeCounts::default(),
            hit_rate: 0.5,
            fa_rate: 0.5,
            d_prime: 0.0,
        };
        let agg = Aggregation {
            summary: vec![row("luna"), row("rex"), row("luna")],
            detail: vec![],
        };
        assert_eq!(agg.subjects(), vec!["luna", "rex"]);
    }
}
