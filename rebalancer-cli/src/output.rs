//! Output formatting for the CLI shell.
//!
//! These are the human-readable log lines spec'd as the tool's contract
//! with operators (spec §6): every accepted migration prints its vmid,
//! source/destination, and pre-move utilizations; every failure prints its
//! kind.

use colored::Colorize;
use tabled::{Table, Tabled};

use rebalancer_core::{Migration, Summary};

#[derive(Tabled)]
struct MigrationRow {
    vmid: u32,
    source: String,
    target: String,
    #[tabled(rename = "source %")]
    pre_source_pct: String,
    #[tabled(rename = "dest %")]
    pre_dest_pct: String,
}

impl From<&Migration> for MigrationRow {
    fn from(m: &Migration) -> Self {
        Self {
            vmid: m.vmid,
            source: m.source.clone(),
            target: m.target.clone(),
            pre_source_pct: format!("{:.2}", m.pre_source_util as f64 / 100.0),
            pre_dest_pct: format!("{:.2}", m.pre_dest_util as f64 / 100.0),
        }
    }
}

/// Render the accepted migrations as a table (spec §6).
pub fn print_migrations(migrations: &[Migration]) {
    if migrations.is_empty() {
        println!("{}", "no migrations planned".yellow());
        return;
    }
    let rows: Vec<MigrationRow> = migrations.iter().map(MigrationRow::from).collect();
    println!("{}", Table::new(rows));
}

pub fn print_failure(kind: &str, detail: &str) {
    println!("{} {}: {}", "failed".red().bold(), kind, detail);
}

pub fn print_info(message: &str) {
    println!("{} {}", "info:".blue().bold(), message);
}

pub fn print_summary(summary: &Summary) {
    println!(
        "{} {} succeeded, {} start-failed, {} failed, {} timed out",
        "summary:".bold(),
        summary.successes,
        summary.start_failed,
        summary.migration_failed,
        summary.timeouts,
    );
}
