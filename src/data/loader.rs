//! Rate File Loader Module
//! Loads CSV and spreadsheet rate files into Polars DataFrames.

use crate::error::{CompareError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Largest magnitude at which every integral f64 is still exact.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A loaded table together with the name of the file it came from.
///
/// Column names are trimmed on construction, so every lookup goes through
/// [`RateTable::column`] with the name the user sees.
#[derive(Debug, Clone)]
pub struct RateTable {
    name: String,
    df: DataFrame,
}

impl RateTable {
    pub fn new(name: impl Into<String>, df: DataFrame) -> Result<Self> {
        let name = name.into();
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let trimmed = column.name().trim().to_string();
            if !seen.insert(trimmed.clone()) {
                return Err(CompareError::DuplicateColumn {
                    table: name,
                    column: trimmed,
                });
            }
            columns.push(column.clone().with_name(trimmed.into()));
        }

        Ok(Self {
            name,
            df: DataFrame::new(columns)?,
        })
    }

    /// Source name as given (usually the file name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source name without directory and extension.
    pub fn base_name(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.name.clone())
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Get list of column names.
    pub fn get_columns(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Look up a column by name, failing with a named error if it is absent.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.df
            .column(name)
            .map_err(|_| CompareError::missing_column(&self.name, name))
    }

    /// Check that every listed column exists before any computation starts.
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.column(name)?;
        }
        Ok(())
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> DataFrame {
        self.df.head(Some(n))
    }
}

/// Cast a column to Float64; text that does not parse and NaN both become null.
/// Text is trimmed first, so `" 0.010"` from a `", "`-separated file is a number.
pub fn coerce_numeric(column: &Column) -> Result<Column> {
    let source = match column.dtype() {
        DataType::String => {
            let trimmed: Vec<Option<&str>> =
                column.str()?.into_iter().map(|v| v.map(str::trim)).collect();
            Column::new(column.name().clone(), trimmed)
        }
        _ => column.clone(),
    };
    let as_f64 = source.cast(&DataType::Float64)?;
    let values: Vec<Option<f64>> = as_f64
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(Column::new(column.name().clone(), values))
}

/// Reads rate files from disk.
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV or spreadsheet, picking the reader by extension.
    pub fn load(path: &Path) -> Result<RateTable> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let df = match extension.as_str() {
            "csv" => Self::load_csv(path)?,
            "xlsx" | "xlsm" | "xls" | "ods" => Self::load_excel(path)?,
            _ => return Err(CompareError::UnsupportedFormat(path.to_path_buf())),
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        info!(file = %name, rows = df.height(), columns = df.width(), "loaded rate file");

        RateTable::new(name, df)
    }

    /// Load the pre-bundled reference spreadsheet, reporting a dedicated
    /// error when it has not been shipped alongside the binary.
    pub fn load_reference(path: &Path) -> Result<RateTable> {
        if !path.exists() {
            return Err(CompareError::ReferenceFileMissing(path.to_path_buf()));
        }
        Self::load(path)
    }

    /// Load a CSV file using Polars.
    pub fn load_csv(path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(CompareError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let path_str = path.to_string_lossy().to_string();
        let df = LazyCsvReader::new(&path_str)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;
        Ok(df)
    }

    /// Load the first worksheet of a spreadsheet. The first row is the header.
    pub fn load_excel(path: &Path) -> Result<DataFrame> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| CompareError::EmptyWorkbook(PathBuf::from(path)))??;

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(DataFrame::empty());
        };

        let names: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Data::Empty => format!("column_{}", i + 1),
                other => other.to_string(),
            })
            .collect();

        let mut cells: Vec<Vec<Option<&Data>>> = vec![Vec::new(); names.len()];
        for row in rows {
            for (i, column) in cells.iter_mut().enumerate() {
                column.push(row.get(i));
            }
        }
        debug!(columns = names.len(), "read worksheet");

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| excel_column(name, &cells))
            .collect::<Vec<_>>();
        Ok(DataFrame::new(columns)?)
    }
}

/// Build one column from worksheet cells: integers stay integers so codes
/// join against CSV-loaded codes, other numbers are Float64, anything mixed
/// is text.
fn excel_column(name: String, cells: &[Option<&Data>]) -> Column {
    let numbers: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            None | Some(Data::Empty) => Some(None),
            Some(Data::Int(i)) => Some(Some(*i as f64)),
            Some(Data::Float(f)) => Some(Some(*f)),
            Some(_) => None,
        })
        .collect();

    match numbers {
        Some(values)
            if values
                .iter()
                .flatten()
                .all(|v| v.fract() == 0.0 && v.abs() < MAX_EXACT_INTEGER) =>
        {
            let ints: Vec<Option<i64>> = values.iter().map(|v| v.map(|x| x as i64)).collect();
            Column::new(name.into(), ints)
        }
        Some(values) => Column::new(name.into(), values),
        None => {
            let text: Vec<Option<String>> = cells
                .iter()
                .map(|cell| cell.and_then(cell_text))
                .collect();
            Column::new(name.into(), text)
        }
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
