//! Report module - CSV export and headline messages

mod export;
mod summary;

pub use export::{
    export_carriers, export_file_name, export_rate_comparisons, export_reconciliation,
    to_csv_bytes, write_csv, ExportedFile,
};
pub use summary::{
    carrier_headline, head_to_head_headline, rate_diagnostics, rate_headline, reconcile_summary,
};
