//! # Batch QC Summary
//!
//! Per-respondent QC flags accumulate on each row during scoring; this module
//! rolls them up into one batch-level report. The summary is descriptive only:
//! it never feeds back into scoring, and an inconsistent smoking status or a
//! malformed cell changes counts here, not scores there.

use crate::aggregate::MAX_MISSING_COMPONENTS;
use crate::types::{QcFlag, ScoredRecord};
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Roll-up of one scored batch, serializable for machine consumption.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QcSummary {
    pub rows_total: usize,
    pub rows_eligible: usize,
    pub rows_scored: usize,
    /// Scored rows where 1–2 components were imputed.
    pub rows_imputed: usize,
    /// Eligible rows left unscored because 3+ components were missing.
    pub rows_insufficient: usize,
    pub inconsistent_smoking_status: usize,
    /// Total malformed cells across the batch (a row may contribute several).
    pub malformed_values: usize,
    pub internal_consistency_errors: usize,
    pub out_of_range_errors: usize,
    /// Eligible respondents per resolved primary type.
    pub by_primary_type: BTreeMap<String, usize>,
}

/// Builds the batch summary from the scored rows.
pub fn summarize(records: &[ScoredRecord]) -> QcSummary {
    let by_primary_type = records
        .iter()
        .filter_map(|r| r.primary_tobacco_type)
        .counts()
        .into_iter()
        .map(|(t, n)| (t.label().to_string(), n))
        .collect();

    let mut summary = QcSummary {
        rows_total: records.len(),
        rows_eligible: 0,
        rows_scored: 0,
        rows_imputed: 0,
        rows_insufficient: 0,
        inconsistent_smoking_status: 0,
        malformed_values: 0,
        internal_consistency_errors: 0,
        out_of_range_errors: 0,
        by_primary_type,
    };

    for record in records {
        if record.is_threshold_eligible {
            summary.rows_eligible += 1;
        }
        let missing = record.components.missing_count();
        if record.ftnd_sum_score.is_some() {
            summary.rows_scored += 1;
            if (1..=MAX_MISSING_COMPONENTS).contains(&missing) {
                summary.rows_imputed += 1;
            }
        } else if record.is_threshold_eligible && missing > MAX_MISSING_COMPONENTS {
            summary.rows_insufficient += 1;
        }

        for flag in &record.qc_flags {
            match flag {
                QcFlag::MalformedValue { .. } => summary.malformed_values += 1,
                QcFlag::InconsistentSmokingStatus => summary.inconsistent_smoking_status += 1,
                QcFlag::InternalConsistency => summary.internal_consistency_errors += 1,
                QcFlag::OutOfRangeScore => summary.out_of_range_errors += 1,
            }
        }
    }

    summary
}

impl QcSummary {
    /// Writes the summary as pretty JSON for downstream tooling.
    pub fn write_json(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}

impl fmt::Display for QcSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "QC summary")?;
        writeln!(f, "  rows:                    {}", self.rows_total)?;
        writeln!(f, "  threshold-eligible:      {}", self.rows_eligible)?;
        writeln!(f, "  scored:                  {}", self.rows_scored)?;
        writeln!(f, "  of which imputed:        {}", self.rows_imputed)?;
        writeln!(f, "  insufficient data:       {}", self.rows_insufficient)?;
        writeln!(
            f,
            "  inconsistent smoking:    {}",
            self.inconsistent_smoking_status
        )?;
        writeln!(f, "  malformed cells:         {}", self.malformed_values)?;
        writeln!(
            f,
            "  internal consistency:    {}",
            self.internal_consistency_errors
        )?;
        writeln!(f, "  out-of-range scores:     {}", self.out_of_range_errors)?;
        for (tobacco_type, count) in &self.by_primary_type {
            writeln!(f, "  primary {tobacco_type}: {count}")?;
        }
        Ok(())
    }
}
