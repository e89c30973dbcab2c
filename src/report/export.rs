//! Result Export Module
//! Writes result tables as CSV files next to each other in an output folder.

use crate::config::Settings;
use crate::error::{CompareError, Result};
use crate::stats::{CarrierAggregation, CarrierAggregator, ComparisonResult, Reconciliation};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// A file written by an export, with its row count for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub rows: usize,
}

/// `<base><suffix>.csv`, e.g. `rates_march_missing_codes.csv`.
pub fn export_file_name(base: &str, suffix: &str) -> String {
    format!("{base}{suffix}.csv")
}

/// Render a table as CSV text with a header row.
pub fn to_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut df = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut df)?;
    Ok(buffer)
}

/// Write a table to `path` as CSV.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<ExportedFile> {
    let io_error = |source| CompareError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut file = File::create(path).map_err(io_error)?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    info!(path = %path.display(), rows = df.height(), "exported");
    Ok(ExportedFile {
        path: path.to_path_buf(),
        rows: df.height(),
    })
}

/// Missing and matched code lists, named after the comparison file.
pub fn export_reconciliation(
    reconciliation: &Reconciliation,
    comparison_base: &str,
    settings: &Settings,
    out_dir: &Path,
) -> Result<Vec<ExportedFile>> {
    let missing = out_dir.join(export_file_name(comparison_base, &settings.missing_suffix));
    let matched = out_dir.join(export_file_name(comparison_base, &settings.matched_suffix));
    Ok(vec![
        write_csv(&reconciliation.missing_table()?, &missing)?,
        write_csv(&reconciliation.found_table()?, &matched)?,
    ])
}

/// Full table, significant rows only, and the per-carrier summary.
pub fn export_carriers(
    aggregation: &CarrierAggregation,
    table: &DataFrame,
    settings: &Settings,
    out_dir: &Path,
) -> Result<Vec<ExportedFile>> {
    let significant = CarrierAggregator::significant(table, settings.significant_threshold)?;
    Ok(vec![
        write_csv(table, &out_dir.join("carrier_comparison_full.csv"))?,
        write_csv(
            &significant,
            &out_dir.join("carrier_comparison_significant.csv"),
        )?,
        write_csv(
            &aggregation.summary.to_dataframe()?,
            &out_dir.join("carrier_summary.csv"),
        )?,
    ])
}

/// One file per compared rate pair, e.g. `rate_1_comparison.csv`.
pub fn export_rate_comparisons(
    results: &[ComparisonResult],
    out_dir: &Path,
) -> Result<Vec<ExportedFile>> {
    results
        .iter()
        .map(|result| {
            let base = result.pair.label.to_lowercase().replace(' ', "_");
            let path = out_dir.join(export_file_name(&base, "_comparison"));
            write_csv(&result.delta.df, &path)
        })
        .collect()
}
