//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - CRD change reports with per-kind colors
//! - Files written by an upgrade

use console::{style, StyledObject};
use olmbump_core::{ChangeKind, ChangeReport, CrdChange, LEGEND, UpgradeOutcome};
use std::path::Path;

fn styled_symbol(change: &CrdChange) -> StyledObject<char> {
    let symbol = style(change.kind.symbol()).bold();
    match change.kind {
        ChangeKind::Added => symbol.green(),
        ChangeKind::Removed => symbol.red(),
        ChangeKind::Modified => symbol.yellow(),
    }
}

/// Print the change report table
pub fn print_change_report(report: &ChangeReport) {
    println!("{}", style(LEGEND).dim());
    for change in &report.changes {
        let row = change.row();
        // Rows start with the one-byte symbol, restyled here
        println!("{}{}", styled_symbol(change), &row[1..]);
    }
    if report.is_empty() {
        println!("{}", style("No CRD changes").dim());
    }
}

/// Print the files written by an upgrade and a summary line
pub fn print_outcome(outcome: &UpgradeOutcome, bundle_root: &Path) {
    let relative = |path: &Path| {
        path.strip_prefix(bundle_root)
            .unwrap_or(path)
            .display()
            .to_string()
    };

    println!();
    println!("{}", style("Written Files").bold());
    for file in &outcome.crd_files {
        println!("  {} {}", style("→").blue(), relative(file));
    }
    println!("  {} {}", style("→").blue(), relative(&outcome.csv_path));
    println!("  {} {}", style("→").blue(), relative(&outcome.package_path));
    println!();

    let report = &outcome.report;
    println!(
        "{} {} rendered ({} added, {} removed, {} changed CRDs)",
        style("✓").green().bold(),
        style(&outcome.csv_name).cyan(),
        report.added().count(),
        report.removed().count(),
        report.modified().count()
    );
}
