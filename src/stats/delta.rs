//! Pairwise Delta Module
//! Percentage change between an old and a new rate column, and the
//! old-vs-new rate file comparison built on it.

use super::mean;
use crate::config::{RatePair, RateRunConfig, Settings};
use crate::data::{coerce_numeric, JoinSide, RateTable, TableJoiner};
use crate::error::{CompareError, Result};
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

/// Name of the derived per-row change column.
pub const CHANGE_COLUMN: &str = "%_change";

/// Headline classification of a mean change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeDirection {
    /// New rates are higher on average.
    Higher,
    /// New rates are lower on average.
    Lower,
    /// Comparable rows exist and the mean change is exactly zero.
    NoChange,
    /// No row had two numeric rates and a non-zero baseline.
    NoData,
}

impl ChangeDirection {
    pub fn classify(mean: Option<f64>) -> Self {
        match mean {
            None => ChangeDirection::NoData,
            Some(m) if m > 0.0 => ChangeDirection::Higher,
            Some(m) if m < 0.0 => ChangeDirection::Lower,
            Some(_) => ChangeDirection::NoChange,
        }
    }
}

/// A joined table with its `%_change` column and the aggregate over it.
#[derive(Debug, Clone)]
pub struct DeltaOutcome {
    pub df: DataFrame,
    pub mean: Option<f64>,
    /// Rows with a defined change.
    pub valid_rows: usize,
    /// Rows whose baseline was zero; their change is left null.
    pub zero_baseline_rows: usize,
}

impl DeltaOutcome {
    pub fn direction(&self) -> ChangeDirection {
        ChangeDirection::classify(self.mean)
    }

    /// The defined per-row changes, in row order.
    pub fn changes(&self) -> Result<Vec<f64>> {
        Ok(self
            .df
            .column(CHANGE_COLUMN)?
            .f64()?
            .into_iter()
            .flatten()
            .collect())
    }
}

/// Computes percentage changes between two numeric columns.
pub struct DeltaCalculator;

impl DeltaCalculator {
    /// `((new - old) / old) * 100`, undefined for a zero baseline.
    pub fn percent_change(old: f64, new: f64) -> Option<f64> {
        if old == 0.0 {
            None
        } else {
            Some((new - old) / old * 100.0)
        }
    }

    /// Add a `%_change` column to `df` and average it over defined rows.
    ///
    /// Both columns are coerced to numbers first; a row with either side
    /// non-numeric gets a null change and does not count toward the mean.
    pub fn compute_delta(df: &DataFrame, old_col: &str, new_col: &str) -> Result<DeltaOutcome> {
        let old = df
            .column(old_col)
            .map_err(|_| CompareError::missing_column("joined table", old_col))?;
        let new = df
            .column(new_col)
            .map_err(|_| CompareError::missing_column("joined table", new_col))?;

        let old = coerce_numeric(old)?;
        let new = coerce_numeric(new)?;

        let mut zero_baseline_rows = 0;
        let changes: Vec<Option<f64>> = old
            .f64()?
            .into_iter()
            .zip(new.f64()?.into_iter())
            .map(|(o, n)| match (o, n) {
                (Some(o), Some(n)) => {
                    let change = Self::percent_change(o, n);
                    if change.is_none() {
                        zero_baseline_rows += 1;
                    }
                    change
                }
                _ => None,
            })
            .collect();

        let valid: Vec<f64> = changes.iter().flatten().copied().collect();
        let mean = mean(&valid);

        let mut out = df.clone();
        out.with_column(old)?;
        out.with_column(new)?;
        out.with_column(Column::new(CHANGE_COLUMN.into(), changes))?;

        Ok(DeltaOutcome {
            df: out,
            mean,
            valid_rows: valid.len(),
            zero_baseline_rows,
        })
    }
}

/// Outcome of comparing one rate pair across the old and new files.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub pair: RatePair,
    /// Output names of the compared columns in `delta.df`.
    pub old_column: String,
    pub new_column: String,
    pub joined_rows: usize,
    pub duplicate_keys_old: usize,
    pub duplicate_keys_new: usize,
    pub delta: DeltaOutcome,
}

/// Compares old and new rate files pair by pair.
pub struct RateComparator;

impl RateComparator {
    /// Join and compare every selected pair. Pairs are independent and run
    /// in parallel; results keep the selection order.
    pub fn compare(
        old: &RateTable,
        new: &RateTable,
        config: &RateRunConfig,
        settings: &Settings,
    ) -> Result<Vec<ComparisonResult>> {
        if config.pairs.is_empty() {
            return Err(CompareError::NoRatePairs);
        }

        // Fail on any bad column name before computing anything.
        let old_columns: Vec<&str> = std::iter::once(config.old_key.as_str())
            .chain(config.pairs.iter().map(|p| p.old_column.as_str()))
            .collect();
        let new_columns: Vec<&str> = std::iter::once(config.new_key.as_str())
            .chain(config.pairs.iter().map(|p| p.new_column.as_str()))
            .collect();
        old.require_columns(&old_columns)?;
        new.require_columns(&new_columns)?;

        config
            .pairs
            .par_iter()
            .map(|pair| Self::compare_pair(old, new, config, pair, settings))
            .collect()
    }

    fn compare_pair(
        old: &RateTable,
        new: &RateTable,
        config: &RateRunConfig,
        pair: &RatePair,
        settings: &Settings,
    ) -> Result<ComparisonResult> {
        let joined = TableJoiner::inner_join(
            JoinSide {
                table: old,
                key: &config.old_key,
                columns: &[pair.old_column.as_str()],
                suffix: &settings.old_suffix,
            },
            JoinSide {
                table: new,
                key: &config.new_key,
                columns: &[pair.new_column.as_str()],
                suffix: &settings.new_suffix,
            },
        )?;

        let old_column = joined.left_columns[0].clone();
        let new_column = joined.right_columns[0].clone();
        let delta = DeltaCalculator::compute_delta(&joined.df, &old_column, &new_column)?;

        if delta.zero_baseline_rows > 0 {
            warn!(
                pair = %pair.label,
                rows = delta.zero_baseline_rows,
                "zero baseline rates excluded from the average"
            );
        }
        info!(
            pair = %pair.label,
            joined = joined.df.height(),
            valid = delta.valid_rows,
            mean = ?delta.mean,
            "rate pair compared"
        );

        Ok(ComparisonResult {
            pair: pair.clone(),
            old_column,
            new_column,
            joined_rows: joined.df.height(),
            duplicate_keys_old: joined.duplicate_keys_left,
            duplicate_keys_new: joined.duplicate_keys_right,
            delta,
        })
    }
}
