//! End-to-end scenarios from spec §8, run against a fake ClusterClient.

mod common;

use common::{FakeClusterClient, VmBehavior};
use rebalancer_common::BalanceMode;
use rebalancer_core::{InventoryCollector, RebalancePlanner};

const GIB: u64 = 1024 * 1024 * 1024;

/// Scenario 1 — trivial two-node balance, memory mode.
#[tokio::test]
async fn scenario_1_two_node_memory_balance() {
    let client = FakeClusterClient::new()
        .with_node("a", 100 * GIB, 4)
        .with_node("b", 100 * GIB, 4)
        .with_vm(1, "a", 20 * GIB, 1)
        .with_vm(2, "a", 20 * GIB, 1)
        .with_vm(3, "a", 20 * GIB, 1)
        .with_vm(4, "a", 20 * GIB, 1);

    let collected = InventoryCollector::collect(&client).await.unwrap();
    let mut snapshot = collected.snapshot;

    let result = RebalancePlanner::run_pass(&client, &mut snapshot, BalanceMode::Memory, 20)
        .await
        .unwrap();

    assert_eq!(result.migrations.len(), 2);
    assert_eq!(result.summary.successes, 2);
    assert_eq!(snapshot.nodes["a"].alloc_memory, 40 * GIB);
    assert_eq!(snapshot.nodes["b"].alloc_memory, 40 * GIB);
    assert!(!rebalancer_core::planner::needs_rebalance(&snapshot, BalanceMode::Memory));
}

/// Scenario 2 — count mode, three nodes.
///
/// spec §8 narrates this as converging to 2/2/2 across 4 migrations; the
/// literal Classify formula in spec §4.C (`count > target + 1`) makes A
/// Balanced as soon as it reaches 3 (3 is not > target+1=3), so the pass
/// here converges after 3 migrations to a 3/2/1 split. See DESIGN.md
/// ("Open Questions") for this decision.
#[tokio::test]
async fn scenario_2_count_mode_three_nodes() {
    let client = FakeClusterClient::new()
        .with_node("a", GIB, 4)
        .with_node("b", GIB, 4)
        .with_node("c", GIB, 4)
        .with_vm(1, "a", GIB, 1)
        .with_vm(2, "a", GIB, 1)
        .with_vm(3, "a", GIB, 1)
        .with_vm(4, "a", GIB, 1)
        .with_vm(5, "a", GIB, 1)
        .with_vm(6, "a", GIB, 1);

    let collected = InventoryCollector::collect(&client).await.unwrap();
    let mut snapshot = collected.snapshot;

    let result = RebalancePlanner::run_pass(&client, &mut snapshot, BalanceMode::Count, 20)
        .await
        .unwrap();

    let order: Vec<String> = result.migrations.iter().map(|m| m.target.clone()).collect();
    assert_eq!(order, vec!["b", "c", "b"]);
    assert_eq!(snapshot.nodes["a"].vm_count, 3);
    assert_eq!(snapshot.nodes["b"].vm_count, 2);
    assert_eq!(snapshot.nodes["c"].vm_count, 1);
}

/// Scenario 3 — destination-guard rejection.
#[tokio::test]
async fn scenario_3_destination_guard_rejects() {
    let client = FakeClusterClient::new()
        .with_node("a", 100 * GIB, 4)
        .with_node("b", 50 * GIB, 4)
        .with_vm(1, "a", 90 * GIB, 1);

    let collected = InventoryCollector::collect(&client).await.unwrap();
    let mut snapshot = collected.snapshot;

    let result = RebalancePlanner::run_pass(&client, &mut snapshot, BalanceMode::Memory, 20)
        .await
        .unwrap();

    assert!(result.migrations.is_empty());
    assert_eq!(snapshot.nodes["a"].alloc_memory, 90 * GIB);
    assert!(rebalancer_core::planner::needs_rebalance(&snapshot, BalanceMode::Memory));
}

/// Scenario 4 — migration failure, snapshot preserved for the failed VM.
#[tokio::test]
async fn scenario_4_migration_failure_preserves_snapshot() {
    let client = FakeClusterClient::new()
        .with_node("a", 100 * GIB, 4)
        .with_node("b", 100 * GIB, 4)
        .with_vm(1, "a", 20 * GIB, 1)
        .with_vm(2, "a", 20 * GIB, 1)
        .with_vm(3, "a", 20 * GIB, 1)
        .with_vm(4, "a", 20 * GIB, 1)
        .with_behavior(1, VmBehavior::MigrationFailed);

    let collected = InventoryCollector::collect(&client).await.unwrap();
    let mut snapshot = collected.snapshot;

    let result = RebalancePlanner::run_pass(&client, &mut snapshot, BalanceMode::Memory, 20)
        .await
        .unwrap();

    assert_eq!(result.summary.migration_failed, 1);
    // vm 1 was the lowest-vmid tie-break candidate and failed; it must
    // still be allocated to its original node (its migration never took).
    assert!(!snapshot.vms.contains_key(&1), "vm 1 dropped from this pass's planning set");
    assert_eq!(snapshot.nodes["a"].alloc_memory, 40 * GIB);
    assert_eq!(snapshot.nodes["b"].alloc_memory, 40 * GIB);
    assert_eq!(result.summary.successes, 2);
}

/// StartFailed is recovered the same way as MigrationFailed: the snapshot
/// is unchanged and the vm is dropped from this pass's planning set.
#[tokio::test]
async fn start_failed_is_recovered_locally() {
    let client = FakeClusterClient::new()
        .with_node("a", 100 * GIB, 4)
        .with_node("b", 100 * GIB, 4)
        .with_vm(1, "a", 20 * GIB, 1)
        .with_vm(2, "a", 20 * GIB, 1)
        .with_vm(3, "a", 20 * GIB, 1)
        .with_vm(4, "a", 20 * GIB, 1)
        .with_behavior(1, VmBehavior::StartFailed);

    let collected = InventoryCollector::collect(&client).await.unwrap();
    let mut snapshot = collected.snapshot;

    let result = RebalancePlanner::run_pass(&client, &mut snapshot, BalanceMode::Memory, 20)
        .await
        .unwrap();

    assert_eq!(result.summary.start_failed, 1);
    assert_eq!(result.summary.successes, 2);
    assert!(!snapshot.vms.contains_key(&1));
}

/// A transport error mid-poll is recovered locally, same as a failed
/// migration, and never aborts the pass (spec §7).
#[tokio::test]
async fn poll_transport_error_is_recovered_locally() {
    let client = FakeClusterClient::new()
        .with_node("a", 100 * GIB, 4)
        .with_node("b", 100 * GIB, 4)
        .with_vm(1, "a", 20 * GIB, 1)
        .with_vm(2, "a", 20 * GIB, 1)
        .with_vm(3, "a", 20 * GIB, 1)
        .with_vm(4, "a", 20 * GIB, 1)
        .with_behavior(1, VmBehavior::PollError);

    let collected = InventoryCollector::collect(&client).await.unwrap();
    let mut snapshot = collected.snapshot;

    let result = RebalancePlanner::run_pass(&client, &mut snapshot, BalanceMode::Memory, 20)
        .await
        .unwrap();

    assert_eq!(result.summary.migration_failed, 1);
    assert_eq!(result.summary.successes, 2);
    assert!(!snapshot.vms.contains_key(&1));
}

/// Scenario 5 — HA timeout preserves the snapshot for that VM.
#[tokio::test(start_paused = true)]
async fn scenario_5_ha_timeout_preserves_snapshot() {
    let client = FakeClusterClient::new()
        .with_node("a", 100 * GIB, 4)
        .with_node("b", 100 * GIB, 4)
        .with_vm(1, "a", 20 * GIB, 1)
        .with_vm(2, "a", 20 * GIB, 1)
        .with_vm(3, "a", 20 * GIB, 1)
        .with_vm(4, "a", 20 * GIB, 1)
        .with_behavior(1, VmBehavior::Timeout)
        .with_ha(1);

    let collected = InventoryCollector::collect(&client).await.unwrap();
    let mut snapshot = collected.snapshot;
    assert!(snapshot.vms[&1].is_ha);

    let result = RebalancePlanner::run_pass(&client, &mut snapshot, BalanceMode::Memory, 20)
        .await
        .unwrap();

    assert_eq!(result.summary.timeouts, 1);
    assert_eq!(snapshot.nodes["a"].alloc_memory, 40 * GIB);
    assert_eq!(snapshot.nodes["b"].alloc_memory, 40 * GIB);
    assert_eq!(result.summary.successes, 2);
}

/// Scenario 6 — already-balanced no-op.
#[tokio::test]
async fn scenario_6_already_balanced_noop() {
    let client = FakeClusterClient::new()
        .with_node("a", 100 * GIB, 4)
        .with_node("b", 100 * GIB, 4)
        .with_vm(1, "a", 50 * GIB, 1)
        .with_vm(2, "b", 50 * GIB, 1);

    let collected = InventoryCollector::collect(&client).await.unwrap();
    let mut snapshot = collected.snapshot;

    assert!(!rebalancer_core::planner::needs_rebalance(&snapshot, BalanceMode::Memory));

    let result = RebalancePlanner::run_pass(&client, &mut snapshot, BalanceMode::Memory, 20)
        .await
        .unwrap();

    assert!(result.migrations.is_empty());
}
