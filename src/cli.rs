//! CLI argument definitions using clap
//!
//! - rate-compare rates        # OLD vs NEW rate files, up to 3 rate pairs
//! - rate-compare top-codes    # exact 7-digit top code check
//! - rate-compare carriers     # cheapest / most expensive across 2-5 carriers
//! - rate-compare head-to-head # one carrier against another, pooled

use clap::{Parser, Subcommand, ValueEnum};
use rate_compare::stats::SortOrder;
use rate_compare::RatePairSelection;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "rate-compare")]
#[command(about = "Compare rate files: percentage changes, carrier rankings and top code checks")]
#[command(version)]
pub struct Cli {
    /// JSON settings file (code length, significance threshold, export suffixes)
    #[arg(long, global = true, env = "RATE_COMPARE_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Write result tables as CSV files into this directory
    #[arg(long, global = true)]
    pub out_dir: Option<PathBuf>,

    /// Rows shown per result table preview
    #[arg(long, global = true, default_value_t = 50)]
    pub preview_rows: usize,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare an OLD and a NEW rate file pair by pair
    Rates {
        #[arg(long)]
        old: PathBuf,
        #[arg(long)]
        new: PathBuf,
        /// Code/prefix column of the OLD file
        #[arg(long)]
        old_key: String,
        /// Code/prefix column of the NEW file
        #[arg(long)]
        new_key: String,
        /// OLD=NEW rate columns; "None" on either side skips the slot (up to 3)
        #[arg(long = "pair", required = true)]
        pairs: Vec<PairArg>,
    },

    /// Check which top codes are found in a comparison file
    TopCodes {
        /// Top codes file; the bundled reference spreadsheet is used when omitted
        #[arg(long)]
        top: Option<PathBuf>,
        #[arg(long)]
        comparison: PathBuf,
        /// Area code column of the top file
        #[arg(long)]
        top_key: String,
        /// Count column of the top file, carried through unchanged
        #[arg(long)]
        count_column: String,
        /// Area code column of the comparison file
        #[arg(long)]
        comparison_key: String,
    },

    /// Find the cheapest and most expensive carrier for every common code
    Carriers {
        /// NAME,FILE,CODE_COLUMN,RATE_COLUMN (2 to 5 times)
        #[arg(long = "carrier", required = true)]
        carriers: Vec<CarrierArg>,
        #[arg(long, value_enum, default_value = "price-desc")]
        sort: SortArg,
        /// Only show codes whose percentage difference exceeds the threshold
        #[arg(long)]
        significant_only: bool,
    },

    /// Pooled percentage change of one carrier against another
    HeadToHead {
        /// NAME,FILE,CODE_COLUMN of the reference carrier
        #[arg(long)]
        baseline: CarrierSideArg,
        /// NAME,FILE,CODE_COLUMN of the carrier being judged
        #[arg(long)]
        challenger: CarrierSideArg,
        /// BASELINE=CHALLENGER rate columns (up to 3)
        #[arg(long = "pair", required = true)]
        pairs: Vec<PairArg>,
    },
}

/// `OLD=NEW` column pair.
#[derive(Debug, Clone)]
pub struct PairArg(pub RatePairSelection);

impl FromStr for PairArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (old, new) = s
            .split_once('=')
            .ok_or_else(|| format!("expected OLD=NEW, got '{s}'"))?;
        Ok(PairArg(RatePairSelection::new(old, new)))
    }
}

/// `NAME,FILE,CODE_COLUMN,RATE_COLUMN`. The file path may contain commas.
#[derive(Debug, Clone)]
pub struct CarrierArg {
    pub name: String,
    pub path: PathBuf,
    pub key_column: String,
    pub rate_column: String,
}

impl FromStr for CarrierArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tail = s.rsplitn(3, ',');
        let rate = tail.next();
        let key = tail.next();
        let head = tail.next();
        let (Some(rate), Some(key), Some((name, path))) =
            (rate, key, head.and_then(|h| h.split_once(',')))
        else {
            return Err(format!("expected NAME,FILE,CODE_COLUMN,RATE_COLUMN, got '{s}'"));
        };

        Ok(CarrierArg {
            name: name.trim().to_string(),
            path: PathBuf::from(path.trim()),
            key_column: key.trim().to_string(),
            rate_column: rate.trim().to_string(),
        })
    }
}

/// `NAME,FILE,CODE_COLUMN`.
#[derive(Debug, Clone)]
pub struct CarrierSideArg {
    pub name: String,
    pub path: PathBuf,
    pub key_column: String,
}

impl FromStr for CarrierSideArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, key) = s
            .rsplit_once(',')
            .ok_or_else(|| format!("expected NAME,FILE,CODE_COLUMN, got '{s}'"))?;
        let (name, path) = head
            .split_once(',')
            .ok_or_else(|| format!("expected NAME,FILE,CODE_COLUMN, got '{s}'"))?;

        Ok(CarrierSideArg {
            name: name.trim().to_string(),
            path: PathBuf::from(path.trim()),
            key_column: key.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Largest price difference first
    PriceDesc,
    /// Smallest price difference first
    PriceAsc,
    /// By code
    Code,
    /// Largest percentage difference first
    PercentDesc,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::PriceDesc => SortOrder::PriceDifferenceDesc,
            SortArg::PriceAsc => SortOrder::PriceDifferenceAsc,
            SortArg::Code => SortOrder::Code,
            SortArg::PercentDesc => SortOrder::PercentageDifferenceDesc,
        }
    }
}
