//! Aggregation engine
//!
//! Partitions trial records into groups under a bucketing strategy, tallies
//! outcomes per group, and derives clamped rates and d-prime in a single
//! pass per group. Each run is a pure function of (trials, bucketing); the
//! engine holds no state between runs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::rates::RateEstimator;
use crate::stats::d_prime;
use crate::types::{
    Aggregation, DetailRow, GroupKey, GroupSummary, OutcomeCounts, TrialRecord, ALL_OUTCOMES,
};

/// Default number of trials per bin for [`Bucketing::ByBin`]
pub const DEFAULT_BIN_SIZE: u32 = 10;

/// Time-bucketing strategy for one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Bucketing {
    /// One group per (subject, date, session)
    BySession,
    /// One pooled group per subject across all trials
    Pooled,
    /// Consecutive fixed-size bins of each subject's date-sorted trials
    ByBin { bin_size: u32 },
}

impl Bucketing {
    /// ByBin with the default bin size of 10
    pub fn by_bin_default() -> Self {
        Bucketing::ByBin {
            bin_size: DEFAULT_BIN_SIZE,
        }
    }

    /// X-axis label the downstream charts use for this strategy
    pub fn x_axis_label(&self) -> String {
        match self {
            Bucketing::BySession => "session".to_string(),
            Bucketing::Pooled => String::new(),
            Bucketing::ByBin { bin_size } => format!("Bins: bin size={bin_size}"),
        }
    }
}

/// Signal-detection aggregation over trial records
pub struct AggregationEngine;

impl AggregationEngine {
    /// Aggregate trials under a bucketing strategy.
    ///
    /// Produces the deduplicated summary table (one row per distinct group
    /// key, rows in first-occurrence order of the bucketed data) and the
    /// detail table of per-(group, outcome) counts. Empty input yields
    /// empty tables, not an error.
    ///
    /// Fails with [`AnalysisError::InvalidBinSize`] before any grouping
    /// when [`Bucketing::ByBin`] is given a zero bin size.
    pub fn aggregate(
        trials: &[TrialRecord],
        bucketing: Bucketing,
    ) -> Result<Aggregation, AnalysisError> {
        if let Bucketing::ByBin { bin_size } = bucketing {
            if bin_size == 0 {
                return Err(AnalysisError::InvalidBinSize(bin_size));
            }
        }

        if trials.is_empty() {
            return Ok(Aggregation {
                summary: Vec::new(),
                detail: Vec::new(),
            });
        }

        let keyed = assign_keys(trials, bucketing);

        // Tally per group, keys kept in first-occurrence order
        let mut order: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<(GroupKey, OutcomeCounts)> = Vec::new();
        for (key, trial) in keyed {
            let slot = *order.entry(key.clone()).or_insert_with(|| {
                groups.push((key, OutcomeCounts::default()));
                groups.len() - 1
            });
            groups[slot].1.record(trial.outcome);
        }

        // One pass per group computes counts, both rates, and d-prime together
        let mut summary = Vec::with_capacity(groups.len());
        let mut detail = Vec::new();
        for (key, counts) in groups {
            for outcome in ALL_OUTCOMES {
                let count = counts.count(outcome);
                if count > 0 {
                    detail.push(DetailRow {
                        key: key.clone(),
                        outcome,
                        count,
                    });
                }
            }

            let hit_rate = RateEstimator::hit_rate_from_counts(&counts);
            let fa_rate = RateEstimator::fa_rate_from_counts(&counts);
            summary.push(GroupSummary {
                key,
                counts,
                hit_rate,
                fa_rate,
                d_prime: d_prime(hit_rate, fa_rate),
            });
        }

        Ok(Aggregation { summary, detail })
    }
}

/// Assign every trial its group key, in the order the bucketing strategy
/// scans the trials.
fn assign_keys(trials: &[TrialRecord], bucketing: Bucketing) -> Vec<(GroupKey, &TrialRecord)> {
    match bucketing {
        Bucketing::BySession => trials
            .iter()
            .map(|t| {
                (
                    GroupKey::Session {
                        subject_id: t.subject_id.clone(),
                        date: t.date,
                        session_id: t.session_id.clone(),
                    },
                    t,
                )
            })
            .collect(),

        Bucketing::Pooled => trials
            .iter()
            .map(|t| {
                (
                    GroupKey::Subject {
                        subject_id: t.subject_id.clone(),
                    },
                    t,
                )
            })
            .collect(),

        Bucketing::ByBin { bin_size } => {
            // Stable sort by (subject, date) keeps original input order for
            // ties, which the bin assignment depends on.
            let mut sorted: Vec<&TrialRecord> = trials.iter().collect();
            sorted.sort_by(|a, b| {
                a.subject_id
                    .cmp(&b.subject_id)
                    .then_with(|| a.date.cmp(&b.date))
            });

            // Bin index: position within the subject's sorted run, divided
            // by bin size, 1-based.
            let mut position: HashMap<&str, u32> = HashMap::new();
            sorted
                .into_iter()
                .map(|t| {
                    let pos = position.entry(t.subject_id.as_str()).or_insert(0);
                    let bin = *pos / bin_size + 1;
                    *pos += 1;
                    (
                        GroupKey::Bin {
                            subject_id: t.subject_id.clone(),
                            bin,
                        },
                        t,
                    )
                })
                .collect()
        }
    }
}
