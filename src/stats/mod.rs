//! Stats module - percentage deltas, carrier aggregation and code reconciliation

mod carrier;
mod delta;
mod head_to_head;
mod reconcile;

pub use carrier::{
    CarrierAggregation, CarrierAggregator, CarrierOutcome, CarrierStanding, CarrierSummary,
    SortOrder, CHEAPEST_CARRIER, CODE_COLUMN, DERIVED_COLUMNS, MAX_RATE, MIN_RATE,
    MOST_EXPENSIVE_CARRIER, PERCENTAGE_DIFFERENCE, PRICE_DIFFERENCE,
};
pub use delta::{
    ChangeDirection, ComparisonResult, DeltaCalculator, DeltaOutcome, RateComparator,
    CHANGE_COLUMN,
};
pub use head_to_head::{HeadToHead, HeadToHeadResult, HeadToHeadVerdict, PairChange};
pub use reconcile::{
    ReconcileCounts, Reconciliation, SetReconciler, FOUND, MISSING, STATUS_COLUMN,
};

use statrs::statistics::Statistics;

/// Arithmetic mean, or `None` for an empty slice.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    }
}
