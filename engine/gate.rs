// ========================================================================================
//                                The Eligibility Gate
// ========================================================================================
//
// Stage 2 of the per-respondent pipeline. A respondent qualifies for scoring
// iff at least one of the five recoded threshold indicators is "yes". The gate
// reads nothing else: in particular `lifetime_smoking_status` never enters
// here. A disagreement between the two is a QC fact surfaced by `validate`,
// not a branch in the gate.

/// Returns whether the respondent is in scope for FTND scoring.
///
/// `indicators` are the five recoded threshold items in [`crate::types::TobaccoType::ALL`]
/// order; `None` means missing after recoding. All-missing and all-no both
/// gate the respondent out.
#[inline]
pub fn is_threshold_eligible(indicators: &[Option<u8>; 5]) -> bool {
    indicators.iter().any(|v| *v == Some(1))
}
