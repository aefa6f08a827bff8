// ========================================================================================
//                                The Score Aggregator
// ========================================================================================
//
// Stage 4 of the per-respondent pipeline. Combines the six recoded components
// into the final 0–10 score under the missing-item tolerance policy:
//
//   0 missing      -> plain sum of component values (full weight total is 10)
//   1–2 missing    -> personal-maximum-weighted imputation: the observed
//                     partial sum is rescaled by 10 / observed_weight_total
//   3+ missing     -> no score; too little information to impute reliably
//
// A component's weight is the number of score points it carries, which equals
// its maximum recoded value: CPD and time-to-first-use span 0–3, the four
// binary items 0–1. The aggregator never rounds; rounding is an output policy
// applied once at serialization (`RoundingPolicy`).

use crate::types::{Component, ComponentValues};
use thiserror::Error;

/// FTND component weights in [`Component::ALL`] order: CPD and
/// time-to-first-use carry 3 points each, the four binary items 1 point each.
pub const DEFAULT_WEIGHTS: [u8; 6] = [3, 3, 1, 1, 1, 1];

/// The largest number of missing components the imputation rule tolerates.
pub const MAX_MISSING_COMPONENTS: usize = 2;

/// The full weight total the imputation rescales to.
pub const FULL_WEIGHT_TOTAL: f64 = 10.0;

// Tolerance for the range check; the score is a short sum of small exact
// values, so anything beyond rounding noise is a real defect.
const RANGE_EPSILON: f64 = 1e-9;

/// A score computed outside [0,10]. This signals a defect in the weight table
/// or recoding, so it fails loudly instead of being clamped silently.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("computed FTND score {value} lies outside [0,10]; weight table or recoding is defective")]
pub struct OutOfRangeScore {
    pub value: f64,
}

/// Aggregates the six components into the final score.
///
/// Returns `Ok(None)` when more than [`MAX_MISSING_COMPONENTS`] components are
/// missing. Eligibility is the caller's concern: ineligible respondents never
/// reach this function.
pub fn aggregate(
    components: &ComponentValues,
    weights: &[u8; 6],
) -> Result<Option<f64>, OutOfRangeScore> {
    let missing_count = components.missing_count();
    if missing_count > MAX_MISSING_COMPONENTS {
        return Ok(None);
    }

    let mut observed_sum = 0.0f64;
    let mut observed_weight_total = 0.0f64;
    for component in Component::ALL {
        if let Some(value) = components.get(component) {
            let weight = weights[component.slot()];
            debug_assert!(
                value <= weight,
                "component {component} value {value} exceeds its weight {weight}"
            );
            observed_sum += f64::from(value);
            observed_weight_total += f64::from(weight);
        }
    }

    // missing_count <= 2 and all weights are positive, so at least four
    // components were observed and the divisor is nonzero.
    let score = if missing_count == 0 {
        observed_sum
    } else {
        (observed_sum / observed_weight_total) * FULL_WEIGHT_TOTAL
    };

    if !(-RANGE_EPSILON..=FULL_WEIGHT_TOTAL + RANGE_EPSILON).contains(&score) {
        return Err(OutOfRangeScore { value: score });
    }

    Ok(Some(score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn values(slots: [Option<u8>; 6]) -> ComponentValues {
        ComponentValues(slots)
    }

    #[test]
    fn fully_observed_maximum_scores_ten() {
        let components = values([Some(3), Some(3), Some(1), Some(1), Some(1), Some(1)]);
        let score = aggregate(&components, &DEFAULT_WEIGHTS).unwrap().unwrap();
        assert_relative_eq!(score, 10.0);
    }

    #[test]
    fn fully_observed_minimum_scores_zero() {
        let components = values([Some(0); 6]);
        let score = aggregate(&components, &DEFAULT_WEIGHTS).unwrap().unwrap();
        assert_relative_eq!(score, 0.0);
    }

    #[test]
    fn fully_observed_mixed_is_the_plain_sum() {
        let components = values([Some(2), Some(1), Some(0), Some(1), Some(0), Some(1)]);
        let score = aggregate(&components, &DEFAULT_WEIGHTS).unwrap().unwrap();
        assert_relative_eq!(score, 5.0);
    }

    /// The canonical partial-imputation case: cpd=3, time missing, the three
    /// observed binaries all 1, ill missing. observed_sum = 3+1+1+1 = 6 over
    /// observed_weight_total = 3+1+1+1 = 6, which rescales to 10.
    #[test]
    fn partial_imputation_rescales_to_full_range() {
        let components = values([Some(3), None, Some(1), Some(1), Some(1), None]);
        let score = aggregate(&components, &DEFAULT_WEIGHTS).unwrap().unwrap();
        assert_relative_eq!(score, 10.0);
    }

    #[test]
    fn one_missing_component_is_rescaled() {
        // cpd=3, time missing, binaries 0: observed_sum 3 over weight 7.
        let components = values([Some(3), None, Some(0), Some(0), Some(0), Some(0)]);
        let score = aggregate(&components, &DEFAULT_WEIGHTS).unwrap().unwrap();
        assert_relative_eq!(score, 3.0 / 7.0 * 10.0);
    }

    #[test]
    fn three_missing_components_yield_no_score() {
        let components = values([Some(3), Some(3), Some(1), None, None, None]);
        assert_eq!(aggregate(&components, &DEFAULT_WEIGHTS).unwrap(), None);
        assert_eq!(
            aggregate(&values([None; 6]), &DEFAULT_WEIGHTS).unwrap(),
            None
        );
    }

    #[test]
    fn imputed_scores_stay_in_range() {
        // Sweep every 0-, 1-, and 2-missing pattern at both extremes.
        for missing_a in 0..6 {
            for missing_b in missing_a..6 {
                for fill_max in [false, true] {
                    let mut slots = [None; 6];
                    for component in Component::ALL {
                        let slot = component.slot();
                        if slot == missing_a || slot == missing_b {
                            continue;
                        }
                        slots[slot] = Some(if fill_max { component.max_value() } else { 0 });
                    }
                    let result = aggregate(&ComponentValues(slots), &DEFAULT_WEIGHTS).unwrap();
                    let score = result.expect("at most two missing");
                    assert!((0.0..=10.0).contains(&score), "score {score} out of range");
                }
            }
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn oversized_component_value_fails_loudly() {
        // A value that could only come from a recoding defect pushes the sum
        // past 10 and must error, not clamp. (Debug builds assert earlier.)
        let components = values([Some(9), Some(3), Some(1), Some(1), Some(1), Some(1)]);
        let err = aggregate(&components, &DEFAULT_WEIGHTS).unwrap_err();
        assert!(err.value > 10.0);
    }
}
