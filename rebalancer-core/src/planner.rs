//! Greedy loop selecting (source, destination, VM) triples, bounded by a
//! migration budget (spec §4.D).

use std::collections::HashSet;

use rebalancer_common::{BalanceMode, Result};
use tracing::info;

use crate::client::{ClusterClient, VmId};
use crate::model::{BalanceModel, Classification};
use crate::snapshot::ClusterSnapshot;
use crate::supervisor::{MigrationOutcome, MigrationSupervisor};

pub const DEFAULT_MAX_MIGRATIONS: usize = 20;
const MAX_CONSECUTIVE_FAILURES: usize = 5;

/// A single accepted migration the planner committed.
#[derive(Debug, Clone)]
pub struct Migration {
    pub vmid: VmId,
    pub source: String,
    pub target: String,
    pub pre_source_util: i64,
    pub pre_dest_util: i64,
}

/// Outcome counters for a pass, reported to the operator (spec §7).
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub successes: usize,
    pub start_failed: usize,
    pub migration_failed: usize,
    pub timeouts: usize,
}

pub struct PassResult {
    pub migrations: Vec<Migration>,
    pub summary: Summary,
}

pub struct RebalancePlanner;

impl RebalancePlanner {
    /// Runs one rebalancing pass against `snapshot`, mutating it in place
    /// after every accepted migration. Deterministic given the same
    /// snapshot, mode, and ClusterClient responses (spec §4.D, "Determinism").
    pub async fn run_pass(
        client: &dyn ClusterClient,
        snapshot: &mut ClusterSnapshot,
        mode: BalanceMode,
        max_migrations: usize,
    ) -> Result<PassResult> {
        let mut migrations = Vec::new();
        let mut summary = Summary::default();
        let mut stuck_sources: HashSet<String> = HashSet::new();
        let mut consecutive_failures = 0usize;

        while migrations.len() < max_migrations {
            let model = BalanceModel::new(snapshot, mode);

            let Some(source) = Self::select_source(&model, snapshot, &stuck_sources) else {
                break;
            };

            let Some(target) = Self::select_destination(&model, snapshot, &source) else {
                break;
            };

            let Some((vmid, pre_source_util, pre_dest_util)) =
                Self::select_vm(&model, snapshot, &source, &target)
            else {
                stuck_sources.insert(source);
                continue;
            };

            let vm = snapshot.vms[&vmid].clone();
            let outcome = MigrationSupervisor::execute(
                client,
                &source,
                &target,
                vmid,
                vm.status,
                vm.is_ha,
            )
            .await?;

            match outcome {
                MigrationOutcome::Success => {
                    info!(
                        vmid = vmid,
                        source = %source,
                        target = %target,
                        pre_source_util,
                        pre_dest_util,
                        "migration accepted"
                    );
                    snapshot.apply_migration(vmid, &target);
                    migrations.push(Migration {
                        vmid,
                        source,
                        target,
                        pre_source_util,
                        pre_dest_util,
                    });
                    summary.successes += 1;
                    consecutive_failures = 0;
                }
                MigrationOutcome::StartFailed(reason) => {
                    info!(vmid = vmid, source = %source, target = %target, reason = %reason, "migration start failed");
                    snapshot.exclude_vm(vmid);
                    summary.start_failed += 1;
                    consecutive_failures += 1;
                }
                MigrationOutcome::Failed(reason) => {
                    info!(vmid = vmid, source = %source, target = %target, reason = %reason, "migration failed");
                    snapshot.exclude_vm(vmid);
                    summary.migration_failed += 1;
                    consecutive_failures += 1;
                }
                MigrationOutcome::Timeout => {
                    info!(vmid = vmid, source = %source, target = %target, "migration timed out, snapshot unchanged");
                    snapshot.exclude_vm(vmid);
                    summary.timeouts += 1;
                    consecutive_failures += 1;
                }
            }

            if consecutive_failures > MAX_CONSECUTIVE_FAILURES {
                break;
            }
        }

        Ok(PassResult { migrations, summary })
    }

    fn select_source(
        model: &BalanceModel<'_>,
        snapshot: &ClusterSnapshot,
        stuck: &HashSet<String>,
    ) -> Option<String> {
        let mut candidates: Vec<&String> = snapshot
            .nodes
            .keys()
            .filter(|n| !stuck.contains(*n))
            .filter(|n| model.classify(n) == Classification::Overloaded)
            .collect();
        candidates.sort_by(|a, b| {
            model
                .utilization_fixed(b)
                .cmp(&model.utilization_fixed(a))
                .then_with(|| a.cmp(b))
        });
        candidates.into_iter().next().cloned()
    }

    fn select_destination(
        model: &BalanceModel<'_>,
        snapshot: &ClusterSnapshot,
        source: &str,
    ) -> Option<String> {
        let mut candidates: Vec<&String> =
            snapshot.nodes.keys().filter(|n| n.as_str() != source).collect();
        candidates.sort_by(|a, b| {
            model
                .utilization_fixed(a)
                .cmp(&model.utilization_fixed(b))
                .then_with(|| a.cmp(b))
        });
        candidates.into_iter().next().cloned()
    }

    /// Simulates moving each VM on `source` to `target`, scores the result,
    /// and returns the best candidate along with the pre-move utilizations
    /// (for the migration log line in spec §6).
    fn select_vm(
        model: &BalanceModel<'_>,
        snapshot: &ClusterSnapshot,
        source: &str,
        target: &str,
    ) -> Option<(VmId, i64, i64)> {
        let target_bp = model.target();
        let threshold = model.threshold();
        let pre_source_util = model.utilization_fixed(source);
        let pre_dest_util = model.utilization_fixed(target);

        let mut candidates: Vec<(VmId, i64)> = snapshot
            .vms
            .values()
            .filter(|vm| vm.assigned_node == source)
            .filter_map(|vm| {
                let (new_source, new_dest) =
                    Self::simulate_move(model, snapshot, source, target, vm.vmid);
                if new_dest > target_bp + 2 * threshold {
                    return None;
                }
                let score = (new_source - target_bp).abs() + (new_dest - target_bp).abs();
                Some((vm.vmid, score))
            })
            .collect();

        candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        candidates
            .into_iter()
            .next()
            .map(|(vmid, _)| (vmid, pre_source_util, pre_dest_util))
    }

    fn simulate_move(
        model: &BalanceModel<'_>,
        snapshot: &ClusterSnapshot,
        source: &str,
        target: &str,
        vmid: VmId,
    ) -> (i64, i64) {
        let vm = &snapshot.vms[&vmid];
        let src = &snapshot.nodes[source];
        let dst = &snapshot.nodes[target];

        match model.mode() {
            BalanceMode::Memory => {
                let new_source = ((src.alloc_memory.saturating_sub(vm.maxmem)) as i64 * 10_000)
                    / src.total_memory.max(1) as i64;
                let new_dest =
                    ((dst.alloc_memory + vm.maxmem) as i64 * 10_000) / dst.total_memory.max(1) as i64;
                (new_source, new_dest)
            }
            BalanceMode::Cpu => {
                let new_source = ((src.alloc_cpu.saturating_sub(vm.vcpus)) as i64 * 10_000)
                    / src.total_cpu.max(1) as i64;
                let new_dest =
                    ((dst.alloc_cpu + vm.vcpus) as i64 * 10_000) / dst.total_cpu.max(1) as i64;
                (new_source, new_dest)
            }
            BalanceMode::Count => (
                (src.vm_count.saturating_sub(1)) as i64,
                (dst.vm_count + 1) as i64,
            ),
        }
    }
}

/// Convenience used by the CLI shell to decide whether running the
/// supervisor at all is worthwhile, without mutating the snapshot.
pub fn needs_rebalance(snapshot: &ClusterSnapshot, mode: BalanceMode) -> bool {
    BalanceModel::new(snapshot, mode).needs_rebalance()
}
