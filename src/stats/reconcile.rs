//! Top Code Reconciliation Module
//! Which normalized top codes appear in a comparison file and which do not.

use crate::config::ReconcileConfig;
use crate::data::{normalize_column, RateTable};
use crate::error::{CompareError, Result};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::info;

pub const STATUS_COLUMN: &str = "Status";
pub const FOUND: &str = "FOUND";
pub const MISSING: &str = "MISSING";

/// Row counts at each stage of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReconcileCounts {
    pub top_rows: usize,
    pub comparison_rows: usize,
    pub top_valid_rows: usize,
    pub comparison_valid_rows: usize,
    pub unique_top_codes: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub found: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    /// One row per unique top code: code, carried aux value, status.
    pub status: DataFrame,
    pub counts: ReconcileCounts,
}

impl Reconciliation {
    pub fn found_table(&self) -> Result<DataFrame> {
        self.with_status(FOUND)
    }

    pub fn missing_table(&self) -> Result<DataFrame> {
        self.with_status(MISSING)
    }

    fn with_status(&self, status: &str) -> Result<DataFrame> {
        let filtered = self
            .status
            .clone()
            .lazy()
            .filter(col(STATUS_COLUMN).eq(lit(status)))
            .collect()?;
        Ok(filtered)
    }
}

/// Matches normalized top codes against a comparison file.
pub struct SetReconciler;

impl SetReconciler {
    /// Normalize both key columns, keep codes of exactly `code_length`
    /// digits, and split the unique top codes into found and missing.
    ///
    /// A top code seen more than once keeps the aux value of its first row.
    /// The status table is ordered by code.
    pub fn reconcile(
        top: &RateTable,
        comparison: &RateTable,
        config: &ReconcileConfig,
        code_length: usize,
    ) -> Result<Reconciliation> {
        top.require_columns(&[config.top_key.as_str(), config.top_aux.as_str()])?;
        Self::check_output_names(top, config)?;
        comparison.require_columns(&[config.comparison_key.as_str()])?;

        let top_codes = normalize_column(top.column(&config.top_key)?, code_length)?;
        let comparison_codes =
            normalize_column(comparison.column(&config.comparison_key)?, code_length)?;

        let comparison_set: HashSet<&str> = comparison_codes
            .iter()
            .filter(|c| c.len() == code_length)
            .map(String::as_str)
            .collect();
        let comparison_valid_rows = comparison_codes
            .iter()
            .filter(|c| c.len() == code_length)
            .count();

        // First valid row per code, ordered by code.
        let mut first_seen: Vec<(&str, IdxSize)> = Vec::new();
        let mut seen = HashSet::new();
        let mut top_valid_rows = 0;
        for (row, code) in top_codes.iter().enumerate() {
            if code.len() != code_length {
                continue;
            }
            top_valid_rows += 1;
            if seen.insert(code.as_str()) {
                first_seen.push((code.as_str(), row as IdxSize));
            }
        }
        first_seen.sort_by(|a, b| a.0.cmp(b.0));

        let mut found = BTreeSet::new();
        let mut missing = BTreeSet::new();
        let mut codes = Vec::with_capacity(first_seen.len());
        let mut statuses = Vec::with_capacity(first_seen.len());
        for (code, _) in &first_seen {
            if comparison_set.contains(code) {
                found.insert(code.to_string());
                statuses.push(FOUND);
            } else {
                missing.insert(code.to_string());
                statuses.push(MISSING);
            }
            codes.push(*code);
        }

        let rows = IdxCa::from_vec(
            "rows".into(),
            first_seen.iter().map(|(_, row)| *row).collect(),
        );
        let aux = top
            .column(&config.top_aux)?
            .as_materialized_series()
            .take(&rows)?
            .into_column();

        let status = DataFrame::new(vec![
            Column::new(config.top_key.as_str().into(), codes),
            aux,
            Column::new(STATUS_COLUMN.into(), statuses),
        ])?;

        let counts = ReconcileCounts {
            top_rows: top.height(),
            comparison_rows: comparison.height(),
            top_valid_rows,
            comparison_valid_rows,
            unique_top_codes: first_seen.len(),
        };
        info!(
            top = top.name(),
            comparison = comparison.name(),
            unique = counts.unique_top_codes,
            found = found.len(),
            missing = missing.len(),
            "top code check complete"
        );

        Ok(Reconciliation {
            found,
            missing,
            status,
            counts,
        })
    }

    /// The status table holds the key, the aux column and `Status`, so the
    /// three names must differ.
    fn check_output_names(top: &RateTable, config: &ReconcileConfig) -> Result<()> {
        let clash = |column: &str, reason: &'static str| CompareError::ColumnClash {
            table: top.name().to_string(),
            column: column.to_string(),
            reason,
        };
        let reserved = "the result table has its own Status column";
        if config.top_key == STATUS_COLUMN {
            return Err(clash(&config.top_key, reserved));
        }
        if config.top_aux == STATUS_COLUMN {
            return Err(clash(&config.top_aux, reserved));
        }
        if config.top_aux == config.top_key {
            let reason = "the count column must differ from the code column";
            return Err(clash(&config.top_aux, reason));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CODE_LENGTH;

    fn config() -> ReconcileConfig {
        ReconcileConfig {
            top_key: "Area Code".to_string(),
            top_aux: "Count".to_string(),
            comparison_key: "Code".to_string(),
        }
    }

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn splits_top_codes_into_found_and_missing() {
        let top = RateTable::new(
            "top.xlsx",
            df!("Area Code" => ["5551234", "5555678"], "Count" => [10i64, 20]).unwrap(),
        )
        .unwrap();
        let comparison = RateTable::new(
            "comp.csv",
            df!("Code" => ["5551234", "5559999"]).unwrap(),
        )
        .unwrap();

        let result = SetReconciler::reconcile(&top, &comparison, &config(), CODE_LENGTH).unwrap();

        assert_eq!(result.found, set(&["5551234"]));
        assert_eq!(result.missing, set(&["5555678"]));
        assert_eq!(result.status.height(), 2);
        assert_eq!(result.found_table().unwrap().height(), 1);
        assert_eq!(result.missing_table().unwrap().height(), 1);

        let statuses: Vec<&str> = result
            .status
            .column(STATUS_COLUMN)
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(statuses, vec![FOUND, MISSING]);
    }

    #[test]
    fn duplicates_keep_first_aux_value() {
        let top = RateTable::new(
            "top.csv",
            df!(
                "Area Code" => ["555-1234", "(555) 1234", "555 9999"],
                "Count" => [10i64, 99, 5]
            )
            .unwrap(),
        )
        .unwrap();
        let comparison =
            RateTable::new("comp.csv", df!("Code" => [5551234i64]).unwrap()).unwrap();

        let result = SetReconciler::reconcile(&top, &comparison, &config(), CODE_LENGTH).unwrap();

        assert_eq!(result.status.height(), 2);
        assert_eq!(result.counts.top_valid_rows, 3);
        assert_eq!(result.counts.unique_top_codes, 2);
        assert_eq!(result.found.len() + result.missing.len(), result.status.height());

        let counts: Vec<i64> = result
            .status
            .column("Count")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(counts, vec![10, 5]);
    }

    #[test]
    fn short_codes_are_dropped_everywhere() {
        let top = RateTable::new(
            "top.csv",
            df!("Area Code" => ["555123", "5551234", ""], "Count" => [1i64, 2, 3]).unwrap(),
        )
        .unwrap();
        let comparison =
            RateTable::new("comp.csv", df!("Code" => ["555123", "5551234"]).unwrap()).unwrap();

        let result = SetReconciler::reconcile(&top, &comparison, &config(), CODE_LENGTH).unwrap();

        assert_eq!(result.found, set(&["5551234"]));
        assert!(result.missing.is_empty());
        assert_eq!(result.counts.top_valid_rows, 1);
        assert_eq!(result.counts.comparison_valid_rows, 1);
    }

    #[test]
    fn eight_digit_codes_keep_their_first_seven_digits() {
        let top = RateTable::new(
            "top.xlsx",
            df!("Area Code" => [55512349.0f64, 55556781.0], "Count" => [4i64, 6]).unwrap(),
        )
        .unwrap();
        let comparison =
            RateTable::new("comp.csv", df!("Code" => [55512340i64]).unwrap()).unwrap();

        let result = SetReconciler::reconcile(&top, &comparison, &config(), CODE_LENGTH).unwrap();

        assert_eq!(result.found, set(&["5551234"]));
        assert_eq!(result.missing, set(&["5555678"]));
        assert_eq!(result.counts.top_valid_rows, 2);
        assert_eq!(result.counts.comparison_valid_rows, 1);
        let codes: Vec<&str> = result
            .status
            .column("Area Code")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(codes, vec!["5551234", "5555678"]);
    }

    #[test]
    fn status_and_key_names_cannot_be_reused_for_the_count() {
        let top = RateTable::new(
            "top.csv",
            df!("Area Code" => ["5551234"], "Status" => ["active"]).unwrap(),
        )
        .unwrap();
        let comparison = RateTable::new("comp.csv", df!("Code" => ["5551234"]).unwrap()).unwrap();

        let status_as_count = ReconcileConfig {
            top_aux: "Status".to_string(),
            ..config()
        };
        let key_as_count = ReconcileConfig {
            top_aux: "Area Code".to_string(),
            ..config()
        };
        for bad in [status_as_count, key_as_count] {
            let err = SetReconciler::reconcile(&top, &comparison, &bad, CODE_LENGTH).unwrap_err();
            assert!(matches!(err, CompareError::ColumnClash { .. }), "{err:?}");
        }
    }

    #[test]
    fn comparison_multiplicity_is_irrelevant() {
        let top = RateTable::new(
            "top.csv",
            df!("Area Code" => ["5551234"], "Count" => [1i64]).unwrap(),
        )
        .unwrap();
        let comparison = RateTable::new(
            "comp.csv",
            df!("Code" => ["5551234", "5551234", "5551234"]).unwrap(),
        )
        .unwrap();

        let result = SetReconciler::reconcile(&top, &comparison, &config(), CODE_LENGTH).unwrap();
        assert_eq!(result.status.height(), 1);
        assert_eq!(result.found.len(), 1);
    }

    #[test]
    fn sets_do_not_depend_on_row_order() {
        let forward = RateTable::new(
            "top.csv",
            df!("Area Code" => ["5550001", "5550002", "5550003"], "Count" => [1i64, 2, 3])
                .unwrap(),
        )
        .unwrap();
        let backward = RateTable::new(
            "top.csv",
            df!("Area Code" => ["5550003", "5550002", "5550001"], "Count" => [3i64, 2, 1])
                .unwrap(),
        )
        .unwrap();
        let comparison =
            RateTable::new("comp.csv", df!("Code" => ["5550002"]).unwrap()).unwrap();

        let a = SetReconciler::reconcile(&forward, &comparison, &config(), CODE_LENGTH).unwrap();
        let b = SetReconciler::reconcile(&backward, &comparison, &config(), CODE_LENGTH).unwrap();

        assert_eq!(a.found, b.found);
        assert_eq!(a.missing, b.missing);
        assert!(a.status.equals(&b.status));
    }

    #[test]
    fn missing_aux_column_is_reported() {
        let top = RateTable::new("top.csv", df!("Area Code" => ["5551234"]).unwrap()).unwrap();
        let comparison = RateTable::new("comp.csv", df!("Code" => ["5551234"]).unwrap()).unwrap();
        assert!(SetReconciler::reconcile(&top, &comparison, &config(), CODE_LENGTH).is_err());
    }
}
