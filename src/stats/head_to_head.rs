//! Head-to-head comparison of two carriers over several rate pairs.

use super::{mean, DeltaCalculator};
use crate::config::{HeadToHeadConfig, Settings};
use crate::data::{JoinSide, TableJoiner};
use crate::error::{CompareError, Result};
use serde::Serialize;
use tracing::{info, warn};

/// How one rate pair contributed to the pooled result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairChange {
    pub label: String,
    /// Codes present in both files with numeric rates and a non-zero baseline.
    pub matched_rows: usize,
    pub mean: Option<f64>,
}

/// Final call on the challenger relative to the baseline carrier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum HeadToHeadVerdict {
    MoreExpensive(f64),
    Cheaper(f64),
    Equal,
    NoCommonCodes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHeadResult {
    pub baseline: String,
    pub challenger: String,
    pub pairs: Vec<PairChange>,
    pub pooled_rows: usize,
    /// Mean over every per-code change of every pair.
    pub pooled_mean: Option<f64>,
}

impl HeadToHeadResult {
    pub fn verdict(&self) -> HeadToHeadVerdict {
        match self.pooled_mean {
            None => HeadToHeadVerdict::NoCommonCodes,
            Some(m) if m > 0.0 => HeadToHeadVerdict::MoreExpensive(m.abs()),
            Some(m) if m < 0.0 => HeadToHeadVerdict::Cheaper(m.abs()),
            Some(_) => HeadToHeadVerdict::Equal,
        }
    }
}

pub struct HeadToHead;

impl HeadToHead {
    /// Pool the per-code change of the challenger against the baseline
    /// across all rate pairs, weighting every matched code equally.
    pub fn compare(config: &HeadToHeadConfig<'_>, settings: &Settings) -> Result<HeadToHeadResult> {
        if config.pairs.is_empty() {
            return Err(CompareError::NoRatePairs);
        }

        let mut pooled = Vec::new();
        let mut pairs = Vec::with_capacity(config.pairs.len());

        for pair in &config.pairs {
            let joined = TableJoiner::inner_join(
                JoinSide {
                    table: config.baseline.table,
                    key: config.baseline.key_column,
                    columns: &[pair.old_column.as_str()],
                    suffix: &settings.old_suffix,
                },
                JoinSide {
                    table: config.challenger.table,
                    key: config.challenger.key_column,
                    columns: &[pair.new_column.as_str()],
                    suffix: &settings.new_suffix,
                },
            )?;

            let delta = DeltaCalculator::compute_delta(
                &joined.df,
                &joined.left_columns[0],
                &joined.right_columns[0],
            )?;
            let changes = delta.changes()?;

            if changes.is_empty() {
                warn!(pair = %pair.label, "no common codes for rate pair");
            }
            pairs.push(PairChange {
                label: pair.label.clone(),
                matched_rows: changes.len(),
                mean: delta.mean,
            });
            pooled.extend(changes);
        }

        let pooled_mean = mean(&pooled);
        info!(
            baseline = config.baseline.name,
            challenger = config.challenger.name,
            rows = pooled.len(),
            mean = ?pooled_mean,
            "head-to-head comparison complete"
        );

        Ok(HeadToHeadResult {
            baseline: config.baseline.name.to_string(),
            challenger: config.challenger.name.to_string(),
            pairs,
            pooled_rows: pooled.len(),
            pooled_mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{select_rate_pairs, CarrierSide, RatePairSelection};
    use crate::data::RateTable;
    use polars::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn carriers() -> (RateTable, RateTable) {
        let first = RateTable::new(
            "carrier1.csv",
            df!(
                "Code" => [1i64, 2, 3],
                "Intra" => [1.0, 2.0, 4.0],
                "Inter" => [1.0, 1.0, 1.0]
            )
            .unwrap(),
        )
        .unwrap();
        let second = RateTable::new(
            "carrier2.csv",
            df!(
                "Prefix" => [1i64, 2, 9],
                "Intra" => [1.2, 2.4, 9.0],
                "Inter" => [Some(0.4), None, Some(1.0)]
            )
            .unwrap(),
        )
        .unwrap();
        (first, second)
    }

    #[test]
    fn pools_changes_across_pairs() {
        let (first, second) = carriers();
        let config = HeadToHeadConfig {
            baseline: CarrierSide { name: "Alpha", key_column: "Code", table: &first },
            challenger: CarrierSide { name: "Beta", key_column: "Prefix", table: &second },
            pairs: select_rate_pairs(&[
                RatePairSelection::new("Intra", "Intra"),
                RatePairSelection::new("Inter", "Inter"),
            ])
            .unwrap(),
        };

        let result = HeadToHead::compare(&config, &Settings::default()).unwrap();

        // Intra: +20%, +20%; Inter: -60% (code 2 has no challenger rate).
        assert_eq!(result.pairs[0].matched_rows, 2);
        assert_eq!(result.pairs[1].matched_rows, 1);
        assert_eq!(result.pooled_rows, 3);
        assert!(approx(result.pooled_mean.unwrap(), -20.0 / 3.0));
        assert!(matches!(result.verdict(), HeadToHeadVerdict::Cheaper(m) if approx(m, 20.0 / 3.0)));
    }

    #[test]
    fn no_overlap_is_no_common_codes() {
        let (first, _) = carriers();
        let other = RateTable::new(
            "carrier3.csv",
            df!("Code" => [7i64], "Intra" => [1.0]).unwrap(),
        )
        .unwrap();
        let config = HeadToHeadConfig {
            baseline: CarrierSide { name: "Alpha", key_column: "Code", table: &first },
            challenger: CarrierSide { name: "Gamma", key_column: "Code", table: &other },
            pairs: select_rate_pairs(&[RatePairSelection::new("Intra", "Intra")]).unwrap(),
        };

        let result = HeadToHead::compare(&config, &Settings::default()).unwrap();
        assert_eq!(result.pairs[0].matched_rows, 0);
        assert_eq!(result.verdict(), HeadToHeadVerdict::NoCommonCodes);
    }

    #[test]
    fn equal_rates_are_equal() {
        let (first, _) = carriers();
        let config = HeadToHeadConfig {
            baseline: CarrierSide { name: "Alpha", key_column: "Code", table: &first },
            challenger: CarrierSide { name: "Alpha again", key_column: "Code", table: &first },
            pairs: select_rate_pairs(&[RatePairSelection::new("Intra", "Intra")]).unwrap(),
        };

        let result = HeadToHead::compare(&config, &Settings::default()).unwrap();
        assert_eq!(result.verdict(), HeadToHeadVerdict::Equal);
    }
}
