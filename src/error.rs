//! Error taxonomy for comparison runs.

use polars::prelude::*;
use std::path::PathBuf;
use thiserror::Error;

/// Broad class of a run failure, used by the caller to pick a message style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreadable file, missing column, incompatible keys.
    Input,
    /// Nothing sensible to compute with the given selection.
    Configuration,
}

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Failed to read spreadsheet: {0}")]
    Excel(#[from] calamine::Error),
    #[error("Spreadsheet {0} has no worksheet")]
    EmptyWorkbook(PathBuf),
    #[error("Unsupported file format: {0} (expected .csv or .xlsx)")]
    UnsupportedFormat(PathBuf),
    #[error("Pre-loaded reference file not found at: {0}")]
    ReferenceFileMissing(PathBuf),
    #[error("Column '{column}' not found in {table}")]
    MissingColumn { table: String, column: String },
    #[error("Column '{column}' appears more than once in {table}")]
    DuplicateColumn { table: String, column: String },
    #[error("Column '{column}' of {table} cannot be used here: {reason}")]
    ColumnClash {
        table: String,
        column: String,
        reason: &'static str,
    },
    #[error("Key columns have different types: '{left}' is {left_dtype}, '{right}' is {right_dtype}")]
    KeyTypeMismatch {
        left: String,
        left_dtype: DataType,
        right: String,
        right_dtype: DataType,
    },
    #[error("Please select at least one rate pair to compare")]
    NoRatePairs,
    #[error("At most {max} rate pairs can be compared, got {got}")]
    TooManyRatePairs { max: usize, got: usize },
    #[error("At least 2 carrier files are required, got {0}")]
    TooFewCarriers(usize),
    #[error("At most {max} carrier files are supported, got {got}")]
    TooManyCarriers { max: usize, got: usize },
    #[error("Carrier name '{0}' is used twice or clashes with a result column")]
    DuplicateCarrierName(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

impl CompareError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompareError::NoRatePairs
            | CompareError::TooManyRatePairs { .. }
            | CompareError::TooFewCarriers(_)
            | CompareError::TooManyCarriers { .. }
            | CompareError::DuplicateCarrierName(_)
            | CompareError::ColumnClash { .. }
            | CompareError::InvalidSettings(_) => ErrorKind::Configuration,
            _ => ErrorKind::Input,
        }
    }

    pub(crate) fn missing_column(table: &str, column: &str) -> Self {
        CompareError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_configuration_errors() {
        assert_eq!(CompareError::NoRatePairs.kind(), ErrorKind::Configuration);
        assert_eq!(CompareError::TooFewCarriers(1).kind(), ErrorKind::Configuration);
        assert_eq!(
            CompareError::missing_column("old.csv", "Rate").kind(),
            ErrorKind::Input
        );
        let duplicate = CompareError::DuplicateColumn {
            table: "old.csv".into(),
            column: "Rate".into(),
        };
        assert_eq!(duplicate.kind(), ErrorKind::Input);
    }

    #[test]
    fn missing_column_message_names_table_and_column() {
        let err = CompareError::missing_column("new.csv", "Prefix");
        assert_eq!(err.to_string(), "Column 'Prefix' not found in new.csv");
    }
}
