// ========================================================================================
//                                    The Recoder
// ========================================================================================
//
// Stage 1 of the per-respondent pipeline. Normalizes one raw coded cell into the
// item's FTND native scale, or into a missing/malformed state. Recoding is pure
// and total: every raw value maps to exactly one `Recoded` outcome, never
// panics, and never lets a value through on its original scale.

use crate::config::MissingPolicy;
use crate::types::Recoded;

/// The declared encoding of one raw survey item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Yes/no item: raw 1 → 1, raw 2 → 0.
    BinaryYesNo,
    /// Frequency item: raw {1,2,3,4} → FTND {0,1,2,3}.
    OrdinalShift,
    /// Wake-up-time item: raw {1,2,3,4} → FTND {3,2,1,0}. Sooner use after
    /// waking scores higher.
    OrdinalReversed,
}

/// Applies `encoding` to one raw cell under the dataset's missing policy.
///
/// The raw cell is the trimmed string as read from the table. Declared
/// missing codes and (by default) blank cells become `Missing`; anything
/// that is neither a declared sentinel nor a valid code for the encoding
/// becomes `Malformed`.
pub fn recode(raw: &str, encoding: Encoding, missing: &MissingPolicy) -> Recoded {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return if missing.blank_is_missing {
            Recoded::Missing
        } else {
            Recoded::Malformed
        };
    }

    let Some(code) = parse_code(trimmed) else {
        return Recoded::Malformed;
    };
    if missing.codes.contains(&code) {
        return Recoded::Missing;
    }

    match encoding {
        Encoding::BinaryYesNo => match code {
            1 => Recoded::Valid(1),
            2 => Recoded::Valid(0),
            _ => Recoded::Malformed,
        },
        Encoding::OrdinalShift => match code {
            1..=4 => Recoded::Valid((code - 1) as u8),
            _ => Recoded::Malformed,
        },
        Encoding::OrdinalReversed => match code {
            1..=4 => Recoded::Valid((4 - code) as u8),
            _ => Recoded::Malformed,
        },
    }
}

/// Parses an integer survey code, tolerating a float spelling ("2.0") as some
/// export tools produce for integer columns.
fn parse_code(text: &str) -> Option<i64> {
    if let Ok(code) = text.parse::<i64>() {
        return Some(code);
    }
    let as_float = text.parse::<f64>().ok()?;
    if as_float.fract() == 0.0 && as_float.abs() < i64::MAX as f64 {
        Some(as_float as i64)
    } else {
        None
    }
}
