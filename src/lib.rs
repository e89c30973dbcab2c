//! Rate Compare - percentage-difference comparisons between rate files
//!
//! Loads two or more rate tables keyed by a code/prefix column and computes:
//! - per-pair average percentage change between old and new rates,
//! - head-to-head pooled change between two carriers,
//! - cheapest and most expensive carrier per code across up to five carriers,
//! - which top codes are found or missing in a comparison file.

pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod stats;

pub use config::{
    select_rate_pairs, CarrierConfig, CarrierSide, ColumnChoice, HeadToHeadConfig, RatePair,
    RatePairSelection, RateRunConfig, ReconcileConfig, Settings,
};
pub use data::{normalize_code, DataLoader, RateTable};
pub use error::{CompareError, ErrorKind, Result};
pub use stats::{CarrierAggregator, HeadToHead, RateComparator, SetReconciler};
