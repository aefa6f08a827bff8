// ========================================================================================
//                              The Tobacco-Type Resolver
// ========================================================================================
//
// Stage 3 of the per-respondent pipeline. Among eligible respondents, picks the
// single primary tobacco type and extracts the type-specific peak-frequency
// item that stands in for CPD in the score.
//
// The tie-break order is questionnaire policy, not anything derived from data:
// when a respondent qualifies under several types, cigarette use dominates the
// score. The order lives in one named constant so alternative cohorts can
// substitute their own list through `ScoringPolicy::type_priority`.

use crate::types::TobaccoType;

/// The default priority order: cigarette > e-cigarette > cigar > cigarillo > pipe.
pub const DEFAULT_TYPE_PRIORITY: [TobaccoType; 5] = [
    TobaccoType::Cigarette,
    TobaccoType::ECigarette,
    TobaccoType::Cigar,
    TobaccoType::Cigarillo,
    TobaccoType::Pipe,
];

/// The resolver's output for one eligible respondent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub primary_type: TobaccoType,
    /// The recoded peak-frequency value (0–3) for the resolved type. `None`
    /// when the respondent said "yes" to the type but left the frequency item
    /// blank; that counts toward the missing-component budget downstream, it
    /// is not a resolver failure and never reassigns the type.
    pub cpd_item: Option<u8>,
}

/// Resolves the primary tobacco type for one respondent.
///
/// `indicators` and `frequencies` are the recoded per-type items in
/// [`TobaccoType::ALL`] slot order. The candidate set is every type whose
/// indicator recoded to 1; the first candidate in `priority` order wins.
///
/// Returns `None` when no type qualifies. For respondents who passed the
/// eligibility gate that state is unreachable; the caller treats it as an
/// internal-consistency error rather than silently dropping the row.
pub fn resolve_primary_type(
    indicators: &[Option<u8>; 5],
    frequencies: &[Option<u8>; 5],
    priority: &[TobaccoType],
) -> Option<Resolution> {
    for &candidate in priority {
        if indicators[candidate.slot()] == Some(1) {
            return Some(Resolution {
                primary_type: candidate,
                cpd_item: frequencies[candidate.slot()],
            });
        }
    }
    None
}
