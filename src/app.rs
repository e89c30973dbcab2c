//! Rate Compare Application
//! Runs one comparison per invocation: load files, compute, print, export.

use crate::cli::{CarrierArg, CarrierSideArg, Cli, Commands, PairArg, SortArg};
use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use rate_compare::config::{select_rate_pairs, CarrierConfig, CarrierSide};
use rate_compare::report;
use rate_compare::stats::{
    CarrierAggregator, CarrierOutcome, HeadToHead, RateComparator, SetReconciler,
};
use rate_compare::{
    DataLoader, HeadToHeadConfig, RatePairSelection, RateRunConfig, RateTable, ReconcileConfig,
    Settings,
};
use std::path::Path;
use tracing::info;

/// Execute the selected command. Every failure is returned to the caller,
/// which turns it into a message; nothing from a failed run is exported.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = match &cli.settings {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };

    let ctx = RunContext {
        settings: &settings,
        out_dir: cli.out_dir.as_deref(),
        preview_rows: cli.preview_rows,
    };

    match &cli.command {
        Commands::Rates {
            old,
            new,
            old_key,
            new_key,
            pairs,
        } => ctx.rates(old, new, old_key, new_key, pairs),
        Commands::TopCodes {
            top,
            comparison,
            top_key,
            count_column,
            comparison_key,
        } => {
            let config = ReconcileConfig {
                top_key: top_key.trim().to_string(),
                top_aux: count_column.trim().to_string(),
                comparison_key: comparison_key.trim().to_string(),
            };
            ctx.top_codes(top.as_deref(), comparison, &config)
        }
        Commands::Carriers {
            carriers,
            sort,
            significant_only,
        } => ctx.carriers(carriers, *sort, *significant_only),
        Commands::HeadToHead {
            baseline,
            challenger,
            pairs,
        } => ctx.head_to_head(baseline, challenger, pairs),
    }
}

struct RunContext<'a> {
    settings: &'a Settings,
    out_dir: Option<&'a Path>,
    preview_rows: usize,
}

impl RunContext<'_> {
    fn rates(
        &self,
        old: &Path,
        new: &Path,
        old_key: &str,
        new_key: &str,
        pairs: &[PairArg],
    ) -> Result<()> {
        let selections: Vec<RatePairSelection> = pairs.iter().map(|p| p.0.clone()).collect();
        let config = RateRunConfig {
            old_key: old_key.trim().to_string(),
            new_key: new_key.trim().to_string(),
            pairs: select_rate_pairs(&selections)?,
        };

        let old = load(old)?;
        let new = load(new)?;
        let results = RateComparator::compare(&old, &new, &config, self.settings)?;

        println!("📈 Rate Comparison Results");
        for result in &results {
            println!();
            println!(
                "📊 {} Comparison: `{}` vs `{}`",
                result.pair.label, result.pair.old_column, result.pair.new_column
            );
            println!("{}", report::rate_headline(result));
            for line in report::rate_diagnostics(result) {
                println!("   {line}");
            }
            self.preview(&result.delta.df);
        }

        if let Some(dir) = self.out_dir {
            self.announce(report::export_rate_comparisons(&results, dir)?);
        }
        Ok(())
    }

    fn top_codes(
        &self,
        top: Option<&Path>,
        comparison: &Path,
        config: &ReconcileConfig,
    ) -> Result<()> {
        let top = match top {
            Some(path) => load(path)?,
            None => DataLoader::load_reference(&self.settings.reference_file)
                .context("no top codes file given and the bundled reference could not be read")?,
        };
        let comparison = load(comparison)?;
        println!("🔍 Processing: {} vs {}", top.name(), comparison.name());

        let reconciliation =
            SetReconciler::reconcile(&top, &comparison, config, self.settings.code_length)?;

        for line in report::reconcile_summary(&reconciliation) {
            println!("{line}");
        }
        println!();
        println!("📋 All Results ({})", reconciliation.status.height());
        self.preview(&reconciliation.status);

        if let Some(dir) = self.out_dir {
            self.announce(report::export_reconciliation(
                &reconciliation,
                &comparison.base_name(),
                self.settings,
                dir,
            )?);
        }
        Ok(())
    }

    fn carriers(
        &self,
        carriers: &[CarrierArg],
        sort: SortArg,
        significant_only: bool,
    ) -> Result<()> {
        let tables = carriers
            .iter()
            .map(|c| load(&c.path))
            .collect::<Result<Vec<_>>>()?;
        let configs: Vec<CarrierConfig<'_>> = carriers
            .iter()
            .zip(&tables)
            .map(|(c, table)| CarrierConfig {
                name: &c.name,
                key_column: &c.key_column,
                rate_column: &c.rate_column,
                table,
            })
            .collect();

        let aggregation = match CarrierAggregator::aggregate(&configs)? {
            CarrierOutcome::Compared(aggregation) => aggregation,
            CarrierOutcome::NoCommonCodes => {
                println!("❌ No common codes found across all carrier files.");
                return Ok(());
            }
        };

        let table = CarrierAggregator::sort(&aggregation.table, sort.into())?;
        let threshold = self.settings.significant_threshold;
        let significant = CarrierAggregator::significant(&table, threshold)?;

        println!("🏢 Carrier Comparison: {} common code(s)", table.height());
        for line in report::carrier_headline(&aggregation.summary) {
            println!("{line}");
        }
        println!(
            "⚠️ {} code(s) differ by more than {threshold}% between cheapest and most expensive",
            significant.height()
        );
        if aggregation.zero_minimum_rows > 0 {
            println!(
                "   {} code(s) have a zero minimum rate; their percentage difference is undefined.",
                aggregation.zero_minimum_rows
            );
        }
        println!();
        self.preview(if significant_only { &significant } else { &table });
        println!("{}", aggregation.summary.to_dataframe()?);

        if let Some(dir) = self.out_dir {
            self.announce(report::export_carriers(&aggregation, &table, self.settings, dir)?);
        }
        Ok(())
    }

    fn head_to_head(
        &self,
        baseline: &CarrierSideArg,
        challenger: &CarrierSideArg,
        pairs: &[PairArg],
    ) -> Result<()> {
        let selections: Vec<RatePairSelection> = pairs.iter().map(|p| p.0.clone()).collect();
        let pairs = select_rate_pairs(&selections)?;

        let baseline_table = load(&baseline.path)?;
        let challenger_table = load(&challenger.path)?;
        let config = HeadToHeadConfig {
            baseline: CarrierSide {
                name: &baseline.name,
                key_column: &baseline.key_column,
                table: &baseline_table,
            },
            challenger: CarrierSide {
                name: &challenger.name,
                key_column: &challenger.key_column,
                table: &challenger_table,
            },
            pairs,
        };

        println!(
            "🔍 Comparing {} rate pair(s) between {} and {}...",
            config.pairs.len(),
            baseline.name,
            challenger.name
        );
        let result = HeadToHead::compare(&config, self.settings)?;
        for pair in &result.pairs {
            match pair.mean {
                Some(mean) => println!(
                    "   {}: {} code(s), average change {mean:.2}%",
                    pair.label, pair.matched_rows
                ),
                None => println!("   ⚠️ No common codes found for {}", pair.label),
            }
        }
        println!();
        println!("🏆 RESULT");
        println!("{}", report::head_to_head_headline(&result));
        Ok(())
    }

    fn preview(&self, df: &DataFrame) {
        if self.preview_rows > 0 {
            println!("{}", df.head(Some(self.preview_rows)));
        }
    }

    fn announce(&self, files: Vec<report::ExportedFile>) {
        for file in files {
            println!("📥 Saved {} ({} rows)", file.path.display(), file.rows);
        }
    }
}

fn load(path: &Path) -> Result<RateTable> {
    let table =
        DataLoader::load(path).with_context(|| format!("loading {}", path.display()))?;
    info!(file = table.name(), rows = table.height(), "file ready");
    Ok(table)
}
