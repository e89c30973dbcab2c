//! Table Joiner Module
//! Inner equality join of two rate tables on a chosen key column.

use crate::data::RateTable;
use crate::error::{CompareError, Result};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Internal name for the key while both sides are in flight.
const JOIN_KEY: &str = "__join_key";

/// One side of a join: which table, which key and which value columns.
#[derive(Debug, Clone, Copy)]
pub struct JoinSide<'a> {
    pub table: &'a RateTable,
    pub key: &'a str,
    pub columns: &'a [&'a str],
    /// Appended to a value column name that also appears on the other side.
    pub suffix: &'a str,
}

/// Result of a join plus the output names of the requested columns.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub df: DataFrame,
    /// Output name of the key column (the left key's name).
    pub key: String,
    pub left_columns: Vec<String>,
    pub right_columns: Vec<String>,
    /// Rows in excess of one per distinct key, per side. Each surplus row
    /// multiplies the matches for its key.
    pub duplicate_keys_left: usize,
    pub duplicate_keys_right: usize,
}

/// Performs relational inner joins between rate tables.
pub struct TableJoiner;

impl TableJoiner {
    /// Inner-join `left` and `right` on exact key equality.
    ///
    /// Duplicate keys produce the cross product of their matches. Null keys
    /// never match. Result rows carry no ordering guarantee.
    pub fn inner_join(left: JoinSide<'_>, right: JoinSide<'_>) -> Result<JoinOutcome> {
        let left_key = left.table.column(left.key)?;
        let right_key = right.table.column(right.key)?;
        left.table.require_columns(left.columns)?;
        right.table.require_columns(right.columns)?;

        if left_key.dtype() != right_key.dtype() {
            return Err(CompareError::KeyTypeMismatch {
                left: left.key.to_string(),
                left_dtype: left_key.dtype().clone(),
                right: right.key.to_string(),
                right_dtype: right_key.dtype().clone(),
            });
        }

        let key_out = left.key.to_string();
        let left_names: HashSet<&str> = left.columns.iter().copied().collect();
        let right_names: HashSet<&str> = right.columns.iter().copied().collect();

        let left_columns = output_names(left.columns, &right_names, &key_out, left.suffix);
        let right_columns = output_names(right.columns, &left_names, &key_out, right.suffix);

        let left_lf = project(left, &left_columns);
        let right_lf = project(right, &right_columns);

        let selection: Vec<Expr> = std::iter::once(col(JOIN_KEY).alias(key_out.as_str()))
            .chain(left_columns.iter().map(|c| col(c.as_str())))
            .chain(right_columns.iter().map(|c| col(c.as_str())))
            .collect();

        let df = left_lf
            .join(
                right_lf,
                [col(JOIN_KEY)],
                [col(JOIN_KEY)],
                JoinArgs::new(JoinType::Inner),
            )
            .select(selection)
            .collect()?;

        let duplicate_keys_left = surplus_rows(left_key)?;
        let duplicate_keys_right = surplus_rows(right_key)?;
        if duplicate_keys_left > 0 || duplicate_keys_right > 0 {
            warn!(
                left = left.table.name(),
                right = right.table.name(),
                duplicate_keys_left,
                duplicate_keys_right,
                "duplicate keys multiply matched rows"
            );
        }
        debug!(
            left_rows = left.table.height(),
            right_rows = right.table.height(),
            joined_rows = df.height(),
            "inner join"
        );

        Ok(JoinOutcome {
            df,
            key: key_out,
            left_columns,
            right_columns,
            duplicate_keys_left,
            duplicate_keys_right,
        })
    }
}

/// Suffix a value column when its name is taken by the other side or the key.
fn output_names(
    columns: &[&str],
    other_side: &HashSet<&str>,
    key_out: &str,
    suffix: &str,
) -> Vec<String> {
    columns
        .iter()
        .map(|c| {
            if other_side.contains(c) || *c == key_out {
                format!("{c}{suffix}")
            } else {
                c.to_string()
            }
        })
        .collect()
}

fn project(side: JoinSide<'_>, output: &[String]) -> LazyFrame {
    let exprs: Vec<Expr> = std::iter::once(col(side.key).alias(JOIN_KEY))
        .chain(
            side.columns
                .iter()
                .zip(output)
                .map(|(c, out)| col(*c).alias(out.as_str())),
        )
        .collect();
    side.table.dataframe().clone().lazy().select(exprs)
}

/// Number of rows beyond the first for every repeated key value.
pub fn surplus_rows(key: &Column) -> Result<usize> {
    let unique = key.as_materialized_series().n_unique()?;
    Ok(key.len().saturating_sub(unique))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, df: DataFrame) -> RateTable {
        RateTable::new(name, df).unwrap()
    }

    #[test]
    fn joins_on_differently_named_keys_and_suffixes_collisions() {
        let old = table(
            "old.csv",
            df!("Prefix" => [1i64, 2, 3], "Rate" => [0.1, 0.2, 0.3]).unwrap(),
        );
        let new = table(
            "new.csv",
            df!("Code" => [2i64, 3, 4], "Rate" => [0.25, 0.3, 0.4]).unwrap(),
        );

        let outcome = TableJoiner::inner_join(
            JoinSide { table: &old, key: "Prefix", columns: &["Rate"], suffix: "_old" },
            JoinSide { table: &new, key: "Code", columns: &["Rate"], suffix: "_new" },
        )
        .unwrap();

        assert_eq!(outcome.key, "Prefix");
        assert_eq!(outcome.left_columns, vec!["Rate_old"]);
        assert_eq!(outcome.right_columns, vec!["Rate_new"]);
        assert_eq!(outcome.df.height(), 2);
        let names: Vec<&str> = outcome
            .df
            .get_column_names()
            .iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(names, vec!["Prefix", "Rate_old", "Rate_new"]);
    }

    #[test]
    fn distinct_names_are_left_alone() {
        let old = table("old.csv", df!("Code" => ["a"], "Old Rate" => [1.0]).unwrap());
        let new = table("new.csv", df!("Code" => ["a"], "New Rate" => [2.0]).unwrap());

        let outcome = TableJoiner::inner_join(
            JoinSide { table: &old, key: "Code", columns: &["Old Rate"], suffix: "_old" },
            JoinSide { table: &new, key: "Code", columns: &["New Rate"], suffix: "_new" },
        )
        .unwrap();

        assert_eq!(outcome.left_columns, vec!["Old Rate"]);
        assert_eq!(outcome.right_columns, vec!["New Rate"]);
        assert_eq!(outcome.df.height(), 1);
    }

    #[test]
    fn duplicate_keys_cross_multiply_and_are_counted() {
        let old = table(
            "old.csv",
            df!("Code" => [7i64, 7, 8], "Rate" => [1.0, 1.5, 2.0]).unwrap(),
        );
        let new = table(
            "new.csv",
            df!("Code" => [7i64, 7, 8], "Rate" => [3.0, 3.5, 4.0]).unwrap(),
        );

        let outcome = TableJoiner::inner_join(
            JoinSide { table: &old, key: "Code", columns: &["Rate"], suffix: "_old" },
            JoinSide { table: &new, key: "Code", columns: &["Rate"], suffix: "_new" },
        )
        .unwrap();

        assert_eq!(outcome.df.height(), 5);
        assert_eq!(outcome.duplicate_keys_left, 1);
        assert_eq!(outcome.duplicate_keys_right, 1);
    }

    #[test]
    fn every_shared_key_appears_with_both_sides_populated() {
        let old = table(
            "old.csv",
            df!("Code" => [10i64, 20, 30], "Rate" => [1.0, 2.0, 3.0]).unwrap(),
        );
        let new = table(
            "new.csv",
            df!("Code" => [30i64, 10], "Rate" => [3.3, 1.1]).unwrap(),
        );

        let outcome = TableJoiner::inner_join(
            JoinSide { table: &old, key: "Code", columns: &["Rate"], suffix: "_old" },
            JoinSide { table: &new, key: "Code", columns: &["Rate"], suffix: "_new" },
        )
        .unwrap();

        let mut keys: Vec<i64> = outcome
            .df
            .column("Code")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        keys.sort();
        assert_eq!(keys, vec![10, 30]);
        assert_eq!(outcome.df.column("Rate_old").unwrap().null_count(), 0);
        assert_eq!(outcome.df.column("Rate_new").unwrap().null_count(), 0);
    }

    #[test]
    fn missing_column_fails_before_joining() {
        let old = table("old.csv", df!("Code" => [1i64], "Rate" => [1.0]).unwrap());
        let new = table("new.csv", df!("Code" => [1i64], "Price" => [1.0]).unwrap());

        let err = TableJoiner::inner_join(
            JoinSide { table: &old, key: "Code", columns: &["Rate"], suffix: "_old" },
            JoinSide { table: &new, key: "Code", columns: &["Rate"], suffix: "_new" },
        )
        .unwrap_err();
        assert!(matches!(err, CompareError::MissingColumn { ref column, .. } if column == "Rate"));
    }

    #[test]
    fn key_type_mismatch_is_rejected() {
        let old = table("old.csv", df!("Code" => [1i64], "Rate" => [1.0]).unwrap());
        let new = table("new.csv", df!("Code" => ["1"], "Rate" => [1.0]).unwrap());

        let err = TableJoiner::inner_join(
            JoinSide { table: &old, key: "Code", columns: &["Rate"], suffix: "_old" },
            JoinSide { table: &new, key: "Code", columns: &["Rate"], suffix: "_new" },
        )
        .unwrap_err();
        assert!(matches!(err, CompareError::KeyTypeMismatch { .. }));
    }
}
