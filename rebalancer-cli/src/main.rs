//! Rebalance CLI
//!
//! Thin command-line shell around the capacity-aware cluster rebalancing
//! engine: a positional mode argument, a confirmation prompt, and colored
//! human-readable output. All rebalancing logic lives in `rebalancer-core`.

mod config;
mod dry_run;
mod output;
mod proxmox_client;

use std::process::ExitCode;
use std::str::FromStr;

use clap::Parser;
use dialoguer::Confirm;
use rebalancer_common::BalanceMode;
use rebalancer_core::planner::DEFAULT_MAX_MIGRATIONS;
use rebalancer_core::{InventoryCollector, RebalancePlanner};

use crate::dry_run::DryRunClient;
use crate::proxmox_client::ProxmoxClient;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Resource dimension to balance (memory, cpu, count)
    #[arg(default_value = "memory")]
    mode: String,

    /// Cluster API server address
    #[arg(long, default_value = "https://localhost:8006")]
    server: String,

    /// Maximum migrations to issue this pass
    #[arg(long, default_value_t = DEFAULT_MAX_MIGRATIONS)]
    max_migrations: usize,

    /// Plan moves but do not issue any migration
    #[arg(long)]
    dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mode = match BalanceMode::from_str(&cli.mode) {
        Ok(m) => m,
        Err(e) => {
            output::print_failure("invalid mode", &e.to_string());
            return ExitCode::from(1);
        }
    };

    let config = config::Config::load().unwrap_or_default();
    let server = if cli.server != "https://localhost:8006" {
        cli.server.clone()
    } else {
        config.default_server.clone()
    };

    let token = match std::env::var("PVE_API_TOKEN").ok().or(config.token.clone()) {
        Some(t) => t,
        None => {
            output::print_failure(
                "precondition",
                "no cluster credentials: set PVE_API_TOKEN or configure a token",
            );
            return ExitCode::from(1);
        }
    };

    let client = ProxmoxClient::new(server, token);

    let collect_result = match InventoryCollector::collect(&client).await {
        Ok(r) => r,
        Err(e) => {
            output::print_failure("precondition", &e.to_string());
            return ExitCode::from(1);
        }
    };

    if collect_result.snapshot.node_count() < 2 {
        output::print_failure("precondition", "cluster has fewer than 2 nodes");
        return ExitCode::from(1);
    }

    let mut snapshot = collect_result.snapshot;

    if !rebalancer_core::planner::needs_rebalance(&snapshot, mode) {
        output::print_info("cluster already balanced, nothing to do");
        return ExitCode::from(0);
    }

    if !cli.yes {
        let proceed = Confirm::new()
            .with_prompt(format!(
                "Cluster is imbalanced on {}. Plan up to {} migration(s)?",
                cli.mode, cli.max_migrations
            ))
            .interact()
            .unwrap_or(false);
        if !proceed {
            output::print_info("rebalance declined");
            return ExitCode::from(2);
        }
    }

    let pass_result = if cli.dry_run {
        let dry_client = DryRunClient::new(&client);
        output::print_info("dry run: no migration will be issued");
        RebalancePlanner::run_pass(&dry_client, &mut snapshot, mode, cli.max_migrations).await
    } else {
        RebalancePlanner::run_pass(&client, &mut snapshot, mode, cli.max_migrations).await
    };

    let pass_result = match pass_result {
        Ok(r) => r,
        Err(e) => {
            output::print_failure("precondition", &e.to_string());
            return ExitCode::from(1);
        }
    };

    output::print_migrations(&pass_result.migrations);
    output::print_summary(&pass_result.summary);

    ExitCode::from(0)
}
