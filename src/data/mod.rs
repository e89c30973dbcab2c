//! Data module - rate file loading, code normalization and joins

mod joiner;
mod loader;
mod normalizer;

pub use joiner::{surplus_rows, JoinOutcome, JoinSide, TableJoiner};
pub use loader::{coerce_numeric, DataLoader, RateTable};
pub use normalizer::{normalize_code, normalize_column, CODE_LENGTH};
