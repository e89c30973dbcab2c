//! Headline messages for comparison results.

use crate::stats::{
    CarrierSummary, ChangeDirection, ComparisonResult, HeadToHeadResult, HeadToHeadVerdict,
    Reconciliation,
};

/// One-line verdict for a rate pair, e.g. "Rate 1: New rates are on
/// average 4.20% higher than Old rates."
pub fn rate_headline(result: &ComparisonResult) -> String {
    let label = &result.pair.label;
    let mean = result.delta.mean.unwrap_or_default();
    match result.delta.direction() {
        ChangeDirection::Higher => format!(
            "🟢 {label}: New rates are on average {mean:.2}% higher than Old rates."
        ),
        ChangeDirection::Lower => format!(
            "🔴 {label}: New rates are on average {:.2}% lower than Old rates.",
            mean.abs()
        ),
        ChangeDirection::NoChange => {
            format!("⚪ {label}: No average change detected (0.00%).")
        }
        ChangeDirection::NoData => {
            format!("⚠️ {label}: No comparable rows ({}).", no_data_reason(result))
        }
    }
}

fn no_data_reason(result: &ComparisonResult) -> String {
    let matched = result.joined_rows;
    let zero = result.delta.zero_baseline_rows;
    let non_numeric = matched - result.delta.valid_rows - zero;
    match (matched, zero, non_numeric) {
        (0, _, _) => "no codes matched".to_string(),
        (_, 0, _) => format!("{matched} code(s) matched, none with numeric rates"),
        (_, _, 0) => format!("{matched} code(s) matched, all with a zero old rate"),
        _ => format!(
            "{matched} code(s) matched: {zero} with a zero old rate, \
             {non_numeric} without numeric rates"
        ),
    }
}

/// Extra lines about rows that were matched but left out of the average.
pub fn rate_diagnostics(result: &ComparisonResult) -> Vec<String> {
    let mut lines = Vec::new();
    let delta = &result.delta;
    let skipped = result.joined_rows - delta.valid_rows - delta.zero_baseline_rows;
    if delta.zero_baseline_rows > 0 {
        lines.push(format!(
            "{} row(s) with a zero old rate were excluded (change undefined).",
            delta.zero_baseline_rows
        ));
    }
    if skipped > 0 {
        lines.push(format!("{skipped} row(s) without numeric rates were excluded."));
    }
    if result.duplicate_keys_old > 0 || result.duplicate_keys_new > 0 {
        lines.push(format!(
            "Duplicate codes: {} extra row(s) in OLD, {} in NEW; matches were multiplied.",
            result.duplicate_keys_old, result.duplicate_keys_new
        ));
    }
    lines
}

pub fn head_to_head_headline(result: &HeadToHeadResult) -> String {
    let (first, second) = (&result.baseline, &result.challenger);
    match result.verdict() {
        HeadToHeadVerdict::MoreExpensive(pct) => {
            format!("🔴 {second} is {pct:.2}% MORE EXPENSIVE than {first}")
        }
        HeadToHeadVerdict::Cheaper(pct) => {
            format!("🟢 {second} is {pct:.2}% CHEAPER than {first}")
        }
        HeadToHeadVerdict::Equal => "⚪ Both carriers have EQUAL rates (0.00% difference)".into(),
        HeadToHeadVerdict::NoCommonCodes => {
            "❌ No common codes found to compare across selected rate types.".into()
        }
    }
}

pub fn reconcile_summary(reconciliation: &Reconciliation) -> Vec<String> {
    let counts = &reconciliation.counts;
    vec![
        format!("Top file: {} rows loaded", counts.top_rows),
        format!("Comparison file: {} rows loaded", counts.comparison_rows),
        format!(
            "After filtering (exact-length codes only): top {} valid rows, comparison {} valid rows",
            counts.top_valid_rows, counts.comparison_valid_rows
        ),
        format!("✅ Total Top Codes: {}", counts.unique_top_codes),
        format!("🟢 Found in Comparison: {}", reconciliation.found.len()),
        format!("🔴 Missing in Comparison: {}", reconciliation.missing.len()),
    ]
}

pub fn carrier_headline(summary: &CarrierSummary) -> Vec<String> {
    let mut lines = vec![
        format!("🏆 Cheapest most often: {}", summary.best),
        format!("💸 Most expensive most often: {}", summary.worst),
    ];
    lines.extend(summary.standings.iter().map(|s| {
        format!(
            "{}: average {:.4}, cheapest on {} code(s), most expensive on {} code(s)",
            s.carrier, s.average_rate, s.cheapest_count, s.most_expensive_count
        )
    }));
    lines
}
