// ========================================================================================
//
//                            THE PER-RESPONDENT SCORING PIPELINE
//
// ========================================================================================
//
// This module composes the four engine stages (Recoder, Eligibility Gate,
// Tobacco-Type Resolver, Score Aggregator) into a single pure function from
// one raw respondent record to its derived fields, and runs that function
// data-parallel over a batch. There is no cross-row state: any row can be
// recomputed independently and idempotently, so the batch is a plain rayon
// `par_iter` with no locking and a stable output order.
//
// Per-respondent failures never abort the batch. Every input row produces an
// output row; where scoring could not be performed the score is absent and a
// machine-readable QC flag set explains why.

use crate::aggregate;
use crate::config::EngineConfig;
use crate::gate;
use crate::recode::{Encoding, recode};
use crate::resolve;
use crate::types::{
    Component, ComponentValues, QcFlag, RawRecord, Recoded, ScoredRecord, TobaccoType,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;
use std::io::IsTerminal;

/// The scoring engine: an immutable configuration plus the pure per-row
/// transformation. Cheap to share across threads; construct once per cohort.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recodes one raw cell and records a malformed-value flag against the
    /// dataset column when the cell fails its declared encoding.
    fn recode_flagged(
        &self,
        raw: &str,
        encoding: Encoding,
        field: &str,
        flags: &mut Vec<QcFlag>,
    ) -> Option<u8> {
        let recoded = recode(raw, encoding, &self.config.missing);
        if recoded == Recoded::Malformed {
            flags.push(QcFlag::MalformedValue {
                field: field.to_string(),
            });
        }
        recoded.value()
    }

    /// Scores one respondent: Recoder -> Gate -> Resolver -> Aggregator.
    ///
    /// Pure and total. Never fails the batch; everything a reviewer needs to
    /// know about a problematic row lands in its `qc_flags`.
    pub fn score_record(&self, raw: &RawRecord) -> ScoredRecord {
        let columns = &self.config.columns;
        let mut flags = Vec::new();

        // --- Stage 1: recode every raw field onto the FTND native scale ---
        let lifetime_smoking = self.recode_flagged(
            &raw.lifetime_smoking,
            Encoding::BinaryYesNo,
            &columns.lifetime_smoking,
            &mut flags,
        );

        let mut indicators = [None; 5];
        let mut frequencies = [None; 5];
        for tobacco_type in TobaccoType::ALL {
            let slot = tobacco_type.slot();
            indicators[slot] = self.recode_flagged(
                &raw.threshold[slot],
                Encoding::BinaryYesNo,
                columns.threshold.get(tobacco_type),
                &mut flags,
            );
            frequencies[slot] = self.recode_flagged(
                &raw.peak_frequency[slot],
                Encoding::OrdinalShift,
                columns.peak_frequency.get(tobacco_type),
                &mut flags,
            );
        }

        let mut components = ComponentValues::default();
        components.set(
            Component::TimeToFirstUse,
            self.recode_flagged(
                &raw.time_to_first_use,
                Encoding::OrdinalReversed,
                &columns.components.time_to_first_use,
                &mut flags,
            ),
        );
        components.set(
            Component::DifficultyRefraining,
            self.recode_flagged(
                &raw.difficulty_refraining,
                Encoding::BinaryYesNo,
                &columns.components.difficulty_refraining,
                &mut flags,
            ),
        );
        components.set(
            Component::HardestToGiveUp,
            self.recode_flagged(
                &raw.hardest_to_give_up,
                Encoding::BinaryYesNo,
                &columns.components.hardest_to_give_up,
                &mut flags,
            ),
        );
        components.set(
            Component::MoreInMorning,
            self.recode_flagged(
                &raw.more_in_morning,
                Encoding::BinaryYesNo,
                &columns.components.more_in_morning,
                &mut flags,
            ),
        );
        components.set(
            Component::UseWhenIll,
            self.recode_flagged(
                &raw.use_when_ill,
                Encoding::BinaryYesNo,
                &columns.components.use_when_ill,
                &mut flags,
            ),
        );

        // --- Stage 2: eligibility gate ---
        let is_threshold_eligible = gate::is_threshold_eligible(&indicators);

        // QC consistency: the gate never corrects a mismatch with the
        // lifetime-smoking item; it only surfaces it.
        match lifetime_smoking {
            Some(0) if is_threshold_eligible => flags.push(QcFlag::InconsistentSmokingStatus),
            Some(1) if !is_threshold_eligible => flags.push(QcFlag::InconsistentSmokingStatus),
            _ => {}
        }

        // --- Stage 3: tobacco-type resolution (eligible respondents only) ---
        let mut primary_tobacco_type = None;
        let mut internal_consistency_error = false;
        if is_threshold_eligible {
            match resolve::resolve_primary_type(
                &indicators,
                &frequencies,
                &self.config.scoring.type_priority,
            ) {
                Some(resolution) => {
                    primary_tobacco_type = Some(resolution.primary_type);
                    components.set(Component::Cpd, resolution.cpd_item);
                }
                None => {
                    // Unreachable while the gate and the priority list agree
                    // on the same five types; surfaced, never dropped.
                    log::error!(
                        "respondent {}: eligible but no tobacco type qualifies; \
                         check scoring.type_priority covers all five types",
                        raw.key
                    );
                    flags.push(QcFlag::InternalConsistency);
                    internal_consistency_error = true;
                }
            }
        }

        // --- Stage 4: aggregation under the missing-item tolerance rule ---
        let ftnd_sum_score = if is_threshold_eligible && !internal_consistency_error {
            match aggregate::aggregate(&components, &self.config.scoring.weights) {
                Ok(score) => score,
                Err(err) => {
                    log::error!("respondent {}: {err}", raw.key);
                    flags.push(QcFlag::OutOfRangeScore);
                    None
                }
            }
        } else {
            None
        };

        ScoredRecord {
            key: raw.key.clone(),
            lifetime_smoking,
            is_threshold_eligible,
            primary_tobacco_type,
            resolved_cpd_item: components.get(Component::Cpd),
            components,
            ftnd_sum_score,
            qc_flags: flags,
        }
    }

    /// Scores a whole batch data-parallel, preserving input order.
    pub fn score_batch(&self, rows: &[RawRecord]) -> Vec<ScoredRecord> {
        let pb = create_progress_bar(rows.len() as u64, "Scoring respondents...");
        let scored = rows
            .par_iter()
            .map(|row| {
                let record = self.score_record(row);
                pb.inc(1);
                record
            })
            .collect();
        pb.finish_and_clear();
        scored
    }
}

fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let draw_target = if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(20)
    } else {
        ProgressDrawTarget::hidden()
    };

    let pb = ProgressBar::with_draw_target(Some(len), draw_target);
    pb.set_style(
        ProgressStyle::with_template(
            "\n> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap()
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    pb.set_message(message.to_string());

    pb
}
