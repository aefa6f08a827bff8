// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used
// in one file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five tobacco types the questionnaire fragments its frequency items over.
///
/// The variant order here is also the default scoring priority (cigarette use
/// dominates when a respondent qualifies under several types); see
/// `resolve::DEFAULT_TYPE_PRIORITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TobaccoType {
    Cigarette,
    ECigarette,
    Cigar,
    Cigarillo,
    Pipe,
}

impl TobaccoType {
    pub const ALL: [TobaccoType; 5] = [
        TobaccoType::Cigarette,
        TobaccoType::ECigarette,
        TobaccoType::Cigar,
        TobaccoType::Cigarillo,
        TobaccoType::Pipe,
    ];

    /// The canonical slot of this type in per-type arrays (`RawRecord::threshold`,
    /// `RawRecord::peak_frequency`). Exhaustive match: adding a type is a
    /// compile-time-checked extension point.
    #[inline]
    pub const fn slot(self) -> usize {
        match self {
            TobaccoType::Cigarette => 0,
            TobaccoType::ECigarette => 1,
            TobaccoType::Cigar => 2,
            TobaccoType::Cigarillo => 3,
            TobaccoType::Pipe => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TobaccoType::Cigarette => "cigarette",
            TobaccoType::ECigarette => "e_cigarette",
            TobaccoType::Cigar => "cigar",
            TobaccoType::Cigarillo => "cigarillo",
            TobaccoType::Pipe => "pipe",
        }
    }
}

impl fmt::Display for TobaccoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The six scored FTND components. CPD and time-to-first-use carry weight 3;
/// the remaining four are binary items with weight 1. Weights total 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Cpd,
    TimeToFirstUse,
    DifficultyRefraining,
    HardestToGiveUp,
    MoreInMorning,
    UseWhenIll,
}

impl Component {
    pub const ALL: [Component; 6] = [
        Component::Cpd,
        Component::TimeToFirstUse,
        Component::DifficultyRefraining,
        Component::HardestToGiveUp,
        Component::MoreInMorning,
        Component::UseWhenIll,
    ];

    #[inline]
    pub const fn slot(self) -> usize {
        match self {
            Component::Cpd => 0,
            Component::TimeToFirstUse => 1,
            Component::DifficultyRefraining => 2,
            Component::HardestToGiveUp => 3,
            Component::MoreInMorning => 4,
            Component::UseWhenIll => 5,
        }
    }

    /// The maximum value a recoded component may take on the FTND native scale.
    #[inline]
    pub const fn max_value(self) -> u8 {
        match self {
            Component::Cpd | Component::TimeToFirstUse => 3,
            Component::DifficultyRefraining
            | Component::HardestToGiveUp
            | Component::MoreInMorning
            | Component::UseWhenIll => 1,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Component::Cpd => "cpd",
            Component::TimeToFirstUse => "time_to_first_use",
            Component::DifficultyRefraining => "difficulty_refraining",
            Component::HardestToGiveUp => "hardest_to_give_up",
            Component::MoreInMorning => "more_in_morning",
            Component::UseWhenIll => "use_when_ill",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An opaque respondent identifier carried verbatim from the input table.
/// It is never parsed, recomputed, or used as an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RespondentKey(pub String);

impl fmt::Display for RespondentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The outcome of applying one declared encoding to one raw cell.
///
/// Recoding is total: every raw value lands in exactly one of these three
/// states. `Malformed` is scored the same as `Missing` but additionally
/// raises a [`QcFlag::MalformedValue`] on the respondent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recoded {
    Valid(u8),
    Missing,
    Malformed,
}

impl Recoded {
    /// Collapses `Malformed` into `None` for scoring purposes.
    #[inline]
    pub fn value(self) -> Option<u8> {
        match self {
            Recoded::Valid(v) => Some(v),
            Recoded::Missing | Recoded::Malformed => None,
        }
    }
}

/// One respondent's raw cells, pulled off the input table by the column map.
/// Cells are carried as trimmed strings; an empty string is a blank answer.
/// Per-type arrays are indexed by [`TobaccoType::slot`].
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub key: RespondentKey,
    pub lifetime_smoking: String,
    pub threshold: [String; 5],
    pub peak_frequency: [String; 5],
    pub time_to_first_use: String,
    pub difficulty_refraining: String,
    pub hardest_to_give_up: String,
    pub more_in_morning: String,
    pub use_when_ill: String,
}

/// The recoded values of the six scored components, indexed by
/// [`Component::slot`]. `None` means missing after recoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentValues(pub [Option<u8>; 6]);

impl ComponentValues {
    #[inline]
    pub fn get(&self, component: Component) -> Option<u8> {
        self.0[component.slot()]
    }

    #[inline]
    pub fn set(&mut self, component: Component, value: Option<u8>) {
        self.0[component.slot()] = value;
    }

    /// Number of components with no usable value (0–6).
    #[inline]
    pub fn missing_count(&self) -> usize {
        self.0.iter().filter(|v| v.is_none()).count()
    }
}

/// A machine-readable per-respondent quality flag. Flags explain why a score
/// is absent or suspect; they never abort the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QcFlag {
    /// A raw cell failed to map under its declared encoding and was coerced
    /// to missing. Carries the dataset column name.
    MalformedValue { field: String },
    /// `lifetime_smoking_status` disagrees with the threshold eligibility
    /// gate. A QC fact, not a scoring failure: the score is unaffected.
    InconsistentSmokingStatus,
    /// The resolver found no qualifying type for an eligible respondent.
    /// Unreachable when the gate holds; surfaced rather than papered over.
    InternalConsistency,
    /// The aggregated score fell outside [0,10], indicating a weight or
    /// encoding defect.
    OutOfRangeScore,
}

impl fmt::Display for QcFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QcFlag::MalformedValue { field } => write!(f, "malformed_value:{field}"),
            QcFlag::InconsistentSmokingStatus => f.write_str("inconsistent_smoking_status"),
            QcFlag::InternalConsistency => f.write_str("internal_consistency"),
            QcFlag::OutOfRangeScore => f.write_str("out_of_range_score"),
        }
    }
}

/// The terminal, fully derived state of one respondent after the four engine
/// stages. Derived fields are set exactly once and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub key: RespondentKey,
    /// Recoded `lifetime_smoking_status` (1=ever, 0=never), kept for QC only.
    pub lifetime_smoking: Option<u8>,
    pub is_threshold_eligible: bool,
    /// `None` iff the respondent is not threshold-eligible (or the defensive
    /// internal-consistency path fired).
    pub primary_tobacco_type: Option<TobaccoType>,
    /// The recoded peak-frequency value for the resolved type, 0–3.
    pub resolved_cpd_item: Option<u8>,
    pub components: ComponentValues,
    /// The final 0–10 score; absent when ineligible or under-observed.
    pub ftnd_sum_score: Option<f64>,
    pub qc_flags: Vec<QcFlag>,
}

impl ScoredRecord {
    #[inline]
    pub fn has_flag(&self, flag: &QcFlag) -> bool {
        self.qc_flags.contains(flag)
    }
}
