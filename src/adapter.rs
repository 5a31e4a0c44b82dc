//! Trial-row adapter
//!
//! Parses normalized trial-row exports (NDJSON or a JSON array) into
//! [`TrialRecord`]s. Upstream tooling is expected to have flattened the
//! source sheets into one object per trial; this adapter absorbs the field
//! spellings and value forms those exports still vary on: subject/session
//! column names, numeric or string session ids, raw outcome tokens, and
//! the sheets' zero-padded DDMMYY date form.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AnalysisError;
use crate::types::{Outcome, TrialRecord};

/// A scalar field that exports serialize as either a number or a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Number(i64),
    Text(String),
}

impl RawScalar {
    fn into_token(self) -> String {
        match self {
            RawScalar::Number(n) => n.to_string(),
            RawScalar::Text(s) => s.trim().to_string(),
        }
    }
}

/// One trial row as it appears in a normalized export
#[derive(Debug, Clone, Deserialize)]
pub struct RawTrialRow {
    /// Subject identifier (`dog_name` in the original sheets)
    #[serde(alias = "subject", alias = "dog_name")]
    pub subject_id: String,

    /// Trial date: ISO `YYYY-MM-DD` or the sheets' `DDMMYY` form
    pub date: RawScalar,

    /// Session identifier within the date
    #[serde(alias = "session", alias = "num_session")]
    pub session_id: RawScalar,

    /// Raw outcome token (`hit`, `miss`, `fp`, `cr`, or canonical spellings)
    #[serde(alias = "score")]
    pub outcome: String,
}

impl RawTrialRow {
    /// Normalize this row into a [`TrialRecord`].
    ///
    /// Fails on an unknown outcome token or an unparseable date; a bad row
    /// rejects the whole run rather than producing a partially-wrong table.
    pub fn normalize(self) -> Result<TrialRecord, AnalysisError> {
        let outcome = Outcome::parse(&self.outcome)?;
        let date = parse_trial_date(&self.date.into_token())?;
        Ok(TrialRecord {
            subject_id: self.subject_id.trim().to_string(),
            date,
            session_id: self.session_id.into_token(),
            outcome,
        })
    }
}

/// A row that failed validation, with its position in the input
#[derive(Debug)]
pub struct RowError {
    pub index: usize,
    pub error: AnalysisError,
}

/// Adapter entry points for trial-row exports
pub struct TrialRowAdapter;

impl TrialRowAdapter {
    /// Parse newline-delimited JSON, one trial row per line.
    ///
    /// Blank lines are skipped. The first malformed line or invalid row
    /// fails the whole parse.
    pub fn parse_ndjson(input: &str) -> Result<Vec<TrialRecord>, AnalysisError> {
        let mut records = Vec::new();
        for (line_no, line) in input.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let row: RawTrialRow = serde_json::from_str(trimmed).map_err(|e| {
                AnalysisError::ParseError(format!("line {}: {}", line_no + 1, e))
            })?;
            records.push(row.normalize()?);
        }
        Ok(records)
    }

    /// Parse a JSON array of trial rows
    pub fn parse_array(input: &str) -> Result<Vec<TrialRecord>, AnalysisError> {
        let rows: Vec<RawTrialRow> = serde_json::from_str(input)?;
        rows.into_iter().map(RawTrialRow::normalize).collect()
    }

    /// Validate rows individually, collecting every failure instead of
    /// stopping at the first. Used by the CLI validation report.
    pub fn validate_rows(rows: Vec<RawTrialRow>) -> Vec<RowError> {
        rows.into_iter()
            .enumerate()
            .filter_map(|(index, row)| {
                row.normalize()
                    .err()
                    .map(|error| RowError { index, error })
            })
            .collect()
    }
}

/// Parse a trial date token.
///
/// ISO `YYYY-MM-DD` is tried first. All-digit tokens of up to six
/// characters are treated as the sheets' `DDMMYY` form, left-padded with
/// zeros (numeric exports drop the leading zero of single-digit days).
fn parse_trial_date(token: &str) -> Result<NaiveDate, AnalysisError> {
    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Ok(date);
    }

    if !token.is_empty() && token.len() <= 6 && token.bytes().all(|b| b.is_ascii_digit()) {
        let padded = format!("{token:0>6}");
        return NaiveDate::parse_from_str(&padded, "%d%m%y")
            .map_err(|e| AnalysisError::DateParseError(format!("{token:?}: {e}")));
    }

    Err(AnalysisError::DateParseError(format!(
        "unrecognized date {token:?}"
    )))
}
