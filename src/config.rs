//! Run Configuration Module
//! Explicit, immutable inputs for one comparison run plus tunable settings.

use crate::data::{RateTable, CODE_LENGTH};
use crate::error::{CompareError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Value a column picker uses for "no column selected".
pub const NONE_SENTINEL: &str = "None";

pub const MAX_RATE_PAIRS: usize = 3;
pub const MIN_CARRIERS: usize = 2;
pub const MAX_CARRIERS: usize = 5;

/// Default location of the bundled top-codes spreadsheet.
pub const DEFAULT_REFERENCE_FILE: &str = "dialer_top_counts_updated.xlsx";

/// A column picked by the user, or the explicit "none" choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnChoice {
    Absent,
    Column(String),
}

impl ColumnChoice {
    /// Parse picker text. The sentinel and blank text both mean absent.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NONE_SENTINEL) {
            ColumnChoice::Absent
        } else {
            ColumnChoice::Column(trimmed.to_string())
        }
    }

    pub fn as_column(&self) -> Option<&str> {
        match self {
            ColumnChoice::Absent => None,
            ColumnChoice::Column(name) => Some(name),
        }
    }
}

/// One slot of the rate-pair picker, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatePairSelection {
    pub old: ColumnChoice,
    pub new: ColumnChoice,
}

impl RatePairSelection {
    pub fn new(old: &str, new: &str) -> Self {
        Self {
            old: ColumnChoice::parse(old),
            new: ColumnChoice::parse(new),
        }
    }
}

/// A validated pair of columns to compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatePair {
    pub old_column: String,
    pub new_column: String,
    pub label: String,
}

/// Keep the slots where both sides are selected. Labels follow the slot
/// position, so a lone second slot is still "Rate 2".
pub fn select_rate_pairs(selections: &[RatePairSelection]) -> Result<Vec<RatePair>> {
    if selections.len() > MAX_RATE_PAIRS {
        return Err(CompareError::TooManyRatePairs {
            max: MAX_RATE_PAIRS,
            got: selections.len(),
        });
    }

    let pairs: Vec<RatePair> = selections
        .iter()
        .enumerate()
        .filter_map(|(slot, selection)| {
            let old = selection.old.as_column()?;
            let new = selection.new.as_column()?;
            Some(RatePair {
                old_column: old.to_string(),
                new_column: new.to_string(),
                label: format!("Rate {}", slot + 1),
            })
        })
        .collect();

    if pairs.is_empty() {
        return Err(CompareError::NoRatePairs);
    }
    Ok(pairs)
}

/// Old-vs-new comparison of one or more rate pairs.
#[derive(Debug, Clone)]
pub struct RateRunConfig {
    pub old_key: String,
    pub new_key: String,
    pub pairs: Vec<RatePair>,
}

/// Top-code check: which columns hold the codes and the carried count.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub top_key: String,
    pub top_aux: String,
    pub comparison_key: String,
}

/// One uploaded carrier file and the columns to read from it.
#[derive(Debug, Clone, Copy)]
pub struct CarrierConfig<'a> {
    pub name: &'a str,
    pub key_column: &'a str,
    pub rate_column: &'a str,
    pub table: &'a RateTable,
}

/// A carrier file in a head-to-head run; rate columns come from the pairs.
#[derive(Debug, Clone, Copy)]
pub struct CarrierSide<'a> {
    pub name: &'a str,
    pub key_column: &'a str,
    pub table: &'a RateTable,
}

/// Two carriers compared over up to three rate pairs.
#[derive(Debug, Clone)]
pub struct HeadToHeadConfig<'a> {
    pub baseline: CarrierSide<'a>,
    pub challenger: CarrierSide<'a>,
    /// `old_column` is read from the baseline, `new_column` from the challenger.
    pub pairs: Vec<RatePair>,
}

/// Check carrier count and that names can serve as distinct column names.
pub fn validate_carriers(carriers: &[CarrierConfig<'_>], reserved: &[&str]) -> Result<()> {
    if carriers.len() < MIN_CARRIERS {
        return Err(CompareError::TooFewCarriers(carriers.len()));
    }
    if carriers.len() > MAX_CARRIERS {
        return Err(CompareError::TooManyCarriers {
            max: MAX_CARRIERS,
            got: carriers.len(),
        });
    }

    let mut seen = HashSet::new();
    for carrier in carriers {
        let name = carrier.name.trim();
        if name.is_empty() || reserved.contains(&name) || !seen.insert(name) {
            return Err(CompareError::DuplicateCarrierName(name.to_string()));
        }
    }
    Ok(())
}

/// Tunables shared by all workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Digits kept by normalization; only codes of exactly this length match.
    pub code_length: usize,
    /// Percentage difference a multi-carrier row must exceed to be significant.
    pub significant_threshold: f64,
    pub old_suffix: String,
    pub new_suffix: String,
    pub missing_suffix: String,
    pub matched_suffix: String,
    pub reference_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            code_length: CODE_LENGTH,
            significant_threshold: 10.0,
            old_suffix: "_old".to_string(),
            new_suffix: "_new".to_string(),
            missing_suffix: "_missing_codes".to_string(),
            matched_suffix: "_matched_codes".to_string(),
            reference_file: PathBuf::from(DEFAULT_REFERENCE_FILE),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file; absent fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CompareError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Settings =
            serde_json::from_str(text).map_err(|e| CompareError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.code_length == 0 {
            return Err(CompareError::InvalidSettings(
                "code_length must be at least 1".to_string(),
            ));
        }
        if !self.significant_threshold.is_finite() {
            return Err(CompareError::InvalidSettings(
                "significant_threshold must be a finite number".to_string(),
            ));
        }
        if self.old_suffix == self.new_suffix {
            return Err(CompareError::InvalidSettings(
                "old_suffix and new_suffix must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn sentinel_and_blank_mean_absent() {
        assert_eq!(ColumnChoice::parse("None"), ColumnChoice::Absent);
        assert_eq!(ColumnChoice::parse(" none "), ColumnChoice::Absent);
        assert_eq!(ColumnChoice::parse(""), ColumnChoice::Absent);
        assert_eq!(
            ColumnChoice::parse(" Rate "),
            ColumnChoice::Column("Rate".to_string())
        );
    }

    #[test]
    fn pairs_need_both_sides_and_keep_slot_labels() {
        let pairs = select_rate_pairs(&[
            RatePairSelection::new("None", "Rate"),
            RatePairSelection::new("Intra", "Intra"),
            RatePairSelection::new("Inter", "None"),
        ])
        .unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].label, "Rate 2");
        assert_eq!(pairs[0].old_column, "Intra");
    }

    #[test]
    fn zero_pairs_is_a_configuration_error() {
        let err = select_rate_pairs(&[RatePairSelection::new("None", "None")]).unwrap_err();
        assert!(matches!(err, CompareError::NoRatePairs));
    }

    #[test]
    fn more_than_three_slots_is_rejected() {
        let slots = vec![RatePairSelection::new("a", "b"); 4];
        assert!(matches!(
            select_rate_pairs(&slots),
            Err(CompareError::TooManyRatePairs { max: 3, got: 4 })
        ));
    }

    #[test]
    fn carrier_names_must_be_unique() {
        let table = RateTable::new("a.csv", df!("Code" => [1i64], "Rate" => [1.0]).unwrap()).unwrap();
        let carrier = |name| CarrierConfig {
            name,
            key_column: "Code",
            rate_column: "Rate",
            table: &table,
        };

        assert!(validate_carriers(&[carrier("A"), carrier("B")], &["Code"]).is_ok());
        assert!(matches!(
            validate_carriers(&[carrier("A")], &["Code"]),
            Err(CompareError::TooFewCarriers(1))
        ));
        assert!(matches!(
            validate_carriers(&[carrier("A"), carrier("A")], &["Code"]),
            Err(CompareError::DuplicateCarrierName(_))
        ));
        assert!(matches!(
            validate_carriers(&[carrier("A"), carrier("Code")], &["Code"]),
            Err(CompareError::DuplicateCarrierName(_))
        ));
        let six = vec![carrier("A"); 6];
        assert!(matches!(
            validate_carriers(&six, &[]),
            Err(CompareError::TooManyCarriers { .. })
        ));
    }

    #[test]
    fn settings_fill_defaults_and_reject_unknown_fields() {
        let settings = Settings::from_json(r#"{ "significant_threshold": 5.0 }"#).unwrap();
        assert_eq!(settings.significant_threshold, 5.0);
        assert_eq!(settings.code_length, 7);
        assert_eq!(settings.missing_suffix, "_missing_codes");

        assert!(matches!(
            Settings::from_json(r#"{ "threshold": 5.0 }"#),
            Err(CompareError::InvalidSettings(_))
        ));
        assert!(matches!(
            Settings::from_json(r#"{ "code_length": 0 }"#),
            Err(CompareError::InvalidSettings(_))
        ));
    }
}
