//! Multi-Carrier Aggregation Module
//! Joins N carrier rate tables on code and finds the cheapest and most
//! expensive carrier per code, plus per-carrier win counts.

use super::{mean, DeltaCalculator};
use crate::config::{validate_carriers, CarrierConfig};
use crate::data::{coerce_numeric, surplus_rows};
use crate::error::{CompareError, Result};
use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

pub const CODE_COLUMN: &str = "Code";
pub const CHEAPEST_CARRIER: &str = "Cheapest_Carrier";
pub const MIN_RATE: &str = "Min_Rate";
pub const MOST_EXPENSIVE_CARRIER: &str = "Most_Expensive_Carrier";
pub const MAX_RATE: &str = "Max_Rate";
pub const PRICE_DIFFERENCE: &str = "Price_Difference";
pub const PERCENTAGE_DIFFERENCE: &str = "Percentage_Difference";

/// Result column names a carrier may not be called.
pub const DERIVED_COLUMNS: [&str; 7] = [
    CODE_COLUMN,
    CHEAPEST_CARRIER,
    MIN_RATE,
    MOST_EXPENSIVE_CARRIER,
    MAX_RATE,
    PRICE_DIFFERENCE,
    PERCENTAGE_DIFFERENCE,
];

/// How one carrier fared across all common codes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierStanding {
    pub carrier: String,
    pub average_rate: f64,
    pub cheapest_count: u32,
    pub most_expensive_count: u32,
}

/// Per-carrier standings plus the overall best and worst carrier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierSummary {
    pub standings: Vec<CarrierStanding>,
    /// Carrier cheapest on the most codes; earlier carriers win ties.
    pub best: String,
    /// Carrier most expensive on the most codes; earlier carriers win ties.
    pub worst: String,
}

impl CarrierSummary {
    /// Columns: Carrier, Average_Rate, Cheapest_Count, Most_Expensive_Count.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let carriers: Vec<String> = self.standings.iter().map(|s| s.carrier.clone()).collect();
        let averages: Vec<f64> = self.standings.iter().map(|s| s.average_rate).collect();
        let cheapest: Vec<u32> = self.standings.iter().map(|s| s.cheapest_count).collect();
        let expensive: Vec<u32> = self
            .standings
            .iter()
            .map(|s| s.most_expensive_count)
            .collect();

        Ok(DataFrame::new(vec![
            Column::new("Carrier".into(), carriers),
            Column::new("Average_Rate".into(), averages),
            Column::new("Cheapest_Count".into(), cheapest),
            Column::new("Most_Expensive_Count".into(), expensive),
        ])?)
    }
}

/// Joined carrier table with derived columns and its summary.
#[derive(Debug, Clone)]
pub struct CarrierAggregation {
    pub table: DataFrame,
    pub summary: CarrierSummary,
    /// Rows whose minimum rate is zero; their percentage difference is null.
    pub zero_minimum_rows: usize,
}

#[derive(Debug, Clone)]
pub enum CarrierOutcome {
    Compared(CarrierAggregation),
    /// No code had a numeric rate in every carrier file.
    NoCommonCodes,
}

/// Presentation order of the multi-carrier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    PriceDifferenceDesc,
    PriceDifferenceAsc,
    Code,
    PercentageDifferenceDesc,
}

/// Builds the multi-carrier comparison.
pub struct CarrierAggregator;

impl CarrierAggregator {
    pub fn aggregate(carriers: &[CarrierConfig<'_>]) -> Result<CarrierOutcome> {
        validate_carriers(carriers, &DERIVED_COLUMNS)?;
        let names: Vec<&str> = carriers.iter().map(|c| c.name.trim()).collect();

        let first_key = carriers[0].table.column(carriers[0].key_column)?;
        let mut joined: Option<LazyFrame> = None;
        for (carrier, name) in carriers.iter().zip(&names) {
            let key = carrier.table.column(carrier.key_column)?;
            let rate = carrier.table.column(carrier.rate_column)?;

            if key.dtype() != first_key.dtype() {
                return Err(CompareError::KeyTypeMismatch {
                    left: carriers[0].key_column.to_string(),
                    left_dtype: first_key.dtype().clone(),
                    right: carrier.key_column.to_string(),
                    right_dtype: key.dtype().clone(),
                });
            }

            let duplicates = surplus_rows(key)?;
            if duplicates > 0 {
                warn!(carrier = %name, duplicates, "duplicate codes multiply matched rows");
            }

            let frame = DataFrame::new(vec![
                key.clone().with_name(CODE_COLUMN.into()),
                coerce_numeric(rate)?.with_name((*name).into()),
            ])?
            .lazy();

            joined = Some(match joined {
                None => frame,
                Some(acc) => acc.join(
                    frame,
                    [col(CODE_COLUMN)],
                    [col(CODE_COLUMN)],
                    JoinArgs::new(JoinType::Inner),
                ),
            });
        }

        let complete = names
            .iter()
            .fold(lit(true), |acc, name| acc.and(col(*name).is_not_null()));
        let df = match joined {
            Some(lf) => lf.filter(complete).collect()?,
            None => return Err(CompareError::TooFewCarriers(0)),
        };

        if df.height() == 0 {
            info!(carriers = names.len(), "no common codes across carriers");
            return Ok(CarrierOutcome::NoCommonCodes);
        }

        let aggregation = Self::derive(df, &names)?;
        info!(
            carriers = names.len(),
            codes = aggregation.table.height(),
            best = %aggregation.summary.best,
            worst = %aggregation.summary.worst,
            "carrier comparison complete"
        );
        Ok(CarrierOutcome::Compared(aggregation))
    }

    /// Add per-row min/max columns and tally standings. Every carrier
    /// column of `df` must be free of nulls.
    fn derive(mut df: DataFrame, names: &[&str]) -> Result<CarrierAggregation> {
        let rates: Vec<Vec<f64>> = names
            .iter()
            .map(|name| -> Result<Vec<f64>> {
                Ok(df.column(name)?.f64()?.into_no_null_iter().collect())
            })
            .collect::<Result<_>>()?;

        let height = df.height();
        let mut cheapest = Vec::with_capacity(height);
        let mut min_rates = Vec::with_capacity(height);
        let mut most_expensive = Vec::with_capacity(height);
        let mut max_rates = Vec::with_capacity(height);
        let mut price_differences = Vec::with_capacity(height);
        let mut percentage_differences: Vec<Option<f64>> = Vec::with_capacity(height);
        let mut cheapest_counts = vec![0u32; names.len()];
        let mut expensive_counts = vec![0u32; names.len()];
        let mut zero_minimum_rows = 0;

        for row in 0..height {
            // Strict comparisons keep the earliest carrier on ties.
            let (mut lo, mut hi) = (0, 0);
            for c in 1..names.len() {
                if rates[c][row] < rates[lo][row] {
                    lo = c;
                }
                if rates[c][row] > rates[hi][row] {
                    hi = c;
                }
            }

            let (min, max) = (rates[lo][row], rates[hi][row]);
            let percentage = DeltaCalculator::percent_change(min, max);
            if percentage.is_none() {
                zero_minimum_rows += 1;
            }

            cheapest_counts[lo] += 1;
            expensive_counts[hi] += 1;
            cheapest.push(names[lo]);
            min_rates.push(min);
            most_expensive.push(names[hi]);
            max_rates.push(max);
            price_differences.push(max - min);
            percentage_differences.push(percentage);
        }

        if zero_minimum_rows > 0 {
            warn!(rows = zero_minimum_rows, "zero minimum rate; percentage difference undefined");
        }

        df.with_column(Column::new(CHEAPEST_CARRIER.into(), cheapest))?;
        df.with_column(Column::new(MIN_RATE.into(), min_rates))?;
        df.with_column(Column::new(MOST_EXPENSIVE_CARRIER.into(), most_expensive))?;
        df.with_column(Column::new(MAX_RATE.into(), max_rates))?;
        df.with_column(Column::new(PRICE_DIFFERENCE.into(), price_differences))?;
        df.with_column(Column::new(PERCENTAGE_DIFFERENCE.into(), percentage_differences))?;

        let standings: Vec<CarrierStanding> = names
            .iter()
            .enumerate()
            .map(|(i, name)| CarrierStanding {
                carrier: name.to_string(),
                average_rate: mean(&rates[i]).unwrap_or(f64::NAN),
                cheapest_count: cheapest_counts[i],
                most_expensive_count: expensive_counts[i],
            })
            .collect();

        let summary = CarrierSummary {
            best: names[first_max(&cheapest_counts)].to_string(),
            worst: names[first_max(&expensive_counts)].to_string(),
            standings,
        };

        Ok(CarrierAggregation {
            table: df,
            summary,
            zero_minimum_rows,
        })
    }

    /// Stable sort for display. Rows with an undefined percentage go last.
    pub fn sort(table: &DataFrame, order: SortOrder) -> Result<DataFrame> {
        let (column, descending) = match order {
            SortOrder::PriceDifferenceDesc => (PRICE_DIFFERENCE, true),
            SortOrder::PriceDifferenceAsc => (PRICE_DIFFERENCE, false),
            SortOrder::Code => (CODE_COLUMN, false),
            SortOrder::PercentageDifferenceDesc => (PERCENTAGE_DIFFERENCE, true),
        };

        let sorted = table
            .clone()
            .lazy()
            .sort(
                [column],
                SortMultipleOptions::default()
                    .with_order_descending(descending)
                    .with_nulls_last(true)
                    .with_maintain_order(true),
            )
            .collect()?;
        Ok(sorted)
    }

    /// Rows whose percentage difference is strictly above `threshold`.
    pub fn significant(table: &DataFrame, threshold: f64) -> Result<DataFrame> {
        let filtered = table
            .clone()
            .lazy()
            .filter(col(PERCENTAGE_DIFFERENCE).gt(lit(threshold)))
            .collect()?;
        Ok(filtered)
    }
}

/// Index of the largest count; the first one wins ties.
fn first_max(counts: &[u32]) -> usize {
    counts
        .iter()
        .enumerate()
        .fold(0, |best, (i, &count)| if count > counts[best] { i } else { best })
}
