//! # Engine Configuration
//!
//! The scoring engine is constructed around an immutable [`EngineConfig`]:
//! dataset-specific column names, missing-value sentinels, the tobacco-type
//! priority list, component weights, and the output rounding policy. Multiple
//! configurations (e.g. different cohorts) can coexist in one process because
//! nothing here is module-level state.
//!
//! Configurations are loaded from a human-readable TOML file and validated
//! eagerly; a config that constructs is a config the pipeline can trust.

use crate::types::{Component, TobaccoType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A comprehensive error type for configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML config file: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("scoring.type_priority must not be empty")]
    EmptyTypePriority,
    #[error("scoring.type_priority lists '{0}' more than once")]
    DuplicateTypePriority(TobaccoType),
    #[error("scoring.weights must sum to 10, got {sum}")]
    BadWeightSum { sum: u32 },
    #[error("scoring.weights entry for '{component}' must be positive")]
    ZeroWeight { component: Component },
    #[error("columns.{0} must not be blank")]
    BlankColumnName(String),
}

/// Dataset-specific column names for the per-type threshold and
/// peak-frequency items, one per [`TobaccoType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeFieldMap {
    pub cigarette: String,
    pub e_cigarette: String,
    pub cigar: String,
    pub cigarillo: String,
    pub pipe: String,
}

impl TypeFieldMap {
    pub fn get(&self, tobacco_type: TobaccoType) -> &str {
        match tobacco_type {
            TobaccoType::Cigarette => &self.cigarette,
            TobaccoType::ECigarette => &self.e_cigarette,
            TobaccoType::Cigar => &self.cigar,
            TobaccoType::Cigarillo => &self.cigarillo,
            TobaccoType::Pipe => &self.pipe,
        }
    }
}

/// Dataset-specific column names for the five type-agnostic FTND sub-items.
/// The sixth component (CPD) has no single column; it is resolved from the
/// per-type peak-frequency fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentFieldMap {
    pub time_to_first_use: String,
    pub difficulty_refraining: String,
    pub hardest_to_give_up: String,
    pub more_in_morning: String,
    pub use_when_ill: String,
}

/// Maps the engine's canonical field names onto the columns of one source
/// dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMap {
    /// The unique respondent key column (opaque identifier).
    pub respondent_key: String,
    /// Ever-smoked indicator, used for QC consistency checks only.
    pub lifetime_smoking: String,
    pub threshold: TypeFieldMap,
    pub peak_frequency: TypeFieldMap,
    pub components: ComponentFieldMap,
}

/// How the source dataset spells "no answer". Declared sentinels are
/// normalized to missing by the Recoder before any other stage sees the
/// value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingPolicy {
    /// Numeric codes the dataset uses for refused/don't-know/not-asked.
    #[serde(default)]
    pub codes: Vec<i64>,
    /// Whether an empty or whitespace-only cell counts as missing (rather
    /// than malformed).
    #[serde(default = "default_true")]
    pub blank_is_missing: bool,
}

impl Default for MissingPolicy {
    fn default() -> Self {
        Self {
            codes: Vec::new(),
            blank_is_missing: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Output rounding policy for the imputed score. The pipeline always carries
/// full precision internally; rounding happens once, at serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingPolicy {
    /// Emit the full f64 precision.
    Exact,
    /// Round to the given number of decimal places.
    Decimals(u8),
}

impl RoundingPolicy {
    pub fn apply(self, score: f64) -> f64 {
        match self {
            RoundingPolicy::Exact => score,
            RoundingPolicy::Decimals(places) => {
                let factor = 10f64.powi(i32::from(places));
                (score * factor).round() / factor
            }
        }
    }
}

/// Fixed scoring policy knobs. The weights and priority order encode domain
/// policy, not anything derived from data; they are overridable so that
/// other cohorts can substitute their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Tie-break order when a respondent qualifies under several types.
    #[serde(default = "default_type_priority")]
    pub type_priority: Vec<TobaccoType>,
    /// Component weights in [`Component::ALL`] order; must sum to 10.
    #[serde(default = "default_weights")]
    pub weights: [u8; 6],
    /// Decimal places kept when the score is written out.
    #[serde(default = "default_rounding_decimals")]
    pub rounding_decimals: u8,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            type_priority: default_type_priority(),
            weights: default_weights(),
            rounding_decimals: default_rounding_decimals(),
        }
    }
}

fn default_type_priority() -> Vec<TobaccoType> {
    crate::resolve::DEFAULT_TYPE_PRIORITY.to_vec()
}

fn default_weights() -> [u8; 6] {
    crate::aggregate::DEFAULT_WEIGHTS
}

fn default_rounding_decimals() -> u8 {
    2
}

impl ScoringPolicy {
    pub fn rounding(&self) -> RoundingPolicy {
        RoundingPolicy::Decimals(self.rounding_decimals)
    }
}

/// The validated, immutable configuration the engine is constructed with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub columns: ColumnMap,
    #[serde(default)]
    pub missing: MissingPolicy,
    #[serde(default)]
    pub scoring: ScoringPolicy,
}

impl EngineConfig {
    /// Loads a configuration from a TOML file and validates it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        Self::from_toml_str(&toml_string)
    }

    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Enforces the structural invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scoring.type_priority.is_empty() {
            return Err(ConfigError::EmptyTypePriority);
        }
        for (i, t) in self.scoring.type_priority.iter().enumerate() {
            if self.scoring.type_priority[..i].contains(t) {
                return Err(ConfigError::DuplicateTypePriority(*t));
            }
        }

        let sum: u32 = self.scoring.weights.iter().map(|&w| u32::from(w)).sum();
        if sum != 10 {
            return Err(ConfigError::BadWeightSum { sum });
        }
        for component in Component::ALL {
            if self.scoring.weights[component.slot()] == 0 {
                return Err(ConfigError::ZeroWeight { component });
            }
        }

        let named = [
            ("respondent_key", &self.columns.respondent_key),
            ("lifetime_smoking", &self.columns.lifetime_smoking),
        ];
        for (name, value) in named {
            if value.trim().is_empty() {
                return Err(ConfigError::BlankColumnName(name.to_string()));
            }
        }
        for tobacco_type in TobaccoType::ALL {
            if self.columns.threshold.get(tobacco_type).trim().is_empty() {
                return Err(ConfigError::BlankColumnName(format!(
                    "threshold.{tobacco_type}"
                )));
            }
            if self
                .columns
                .peak_frequency
                .get(tobacco_type)
                .trim()
                .is_empty()
            {
                return Err(ConfigError::BlankColumnName(format!(
                    "peak_frequency.{tobacco_type}"
                )));
            }
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::EXAMPLE_TOML;
    use super::*;

    #[test]
    fn example_config_parses_with_defaults() {
        let config = EngineConfig::from_toml_str(EXAMPLE_TOML).unwrap();
        assert_eq!(config.columns.respondent_key, "SEQN");
        assert_eq!(
            config.scoring.type_priority,
            crate::resolve::DEFAULT_TYPE_PRIORITY.to_vec()
        );
        assert_eq!(config.scoring.weights, [3, 3, 1, 1, 1, 1]);
        assert_eq!(config.scoring.rounding_decimals, 2);
        assert!(config.missing.blank_is_missing);
        assert_eq!(config.missing.codes, vec![7, 9, 77, 99]);
    }

    #[test]
    fn duplicate_priority_is_rejected() {
        let mut config = EngineConfig::from_toml_str(EXAMPLE_TOML).unwrap();
        config.scoring.type_priority = vec![TobaccoType::Cigar, TobaccoType::Cigar];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateTypePriority(TobaccoType::Cigar))
        ));
    }

    #[test]
    fn weights_must_sum_to_ten() {
        let mut config = EngineConfig::from_toml_str(EXAMPLE_TOML).unwrap();
        config.scoring.weights = [3, 3, 1, 1, 1, 2];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadWeightSum { sum: 11 })
        ));
    }

    #[test]
    fn rounding_policy_rounds_at_requested_precision() {
        let policy = RoundingPolicy::Decimals(2);
        assert_eq!(policy.apply(6.66666), 6.67);
        assert_eq!(RoundingPolicy::Exact.apply(6.66666), 6.66666);
    }

    #[test]
    fn blank_column_name_is_rejected() {
        let mut config = EngineConfig::from_toml_str(EXAMPLE_TOML).unwrap();
        config.columns.threshold.pipe = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BlankColumnName(_))
        ));
    }
}
