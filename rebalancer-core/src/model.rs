//! Per-node and cluster-wide utilization, expressed as exact integers
//! (spec §4.C).
//!
//! All arithmetic here is fixed-point, scaled to basis points (×10 000), so
//! the scoring function in [`crate::planner`] and the threshold checks are
//! exact — no floating-point nondeterminism between runs or platforms.

use rebalancer_common::BalanceMode;

use crate::snapshot::ClusterSnapshot;

const BASIS_POINTS: i64 = 10_000;
const MIN_THRESHOLD_BP: i64 = 100; // 1%, floor for lightly-loaded clusters

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Overloaded,
    Underloaded,
    Balanced,
}

pub struct BalanceModel<'a> {
    snapshot: &'a ClusterSnapshot,
    mode: BalanceMode,
}

impl<'a> BalanceModel<'a> {
    pub fn new(snapshot: &'a ClusterSnapshot, mode: BalanceMode) -> Self {
        Self { snapshot, mode }
    }

    pub fn mode(&self) -> BalanceMode {
        self.mode
    }

    /// Utilization of `node`, scaled to basis points for memory/cpu, or the
    /// raw VM count for `count` mode.
    pub fn utilization_fixed(&self, node: &str) -> i64 {
        let n = &self.snapshot.nodes[node];
        match self.mode {
            BalanceMode::Memory => {
                (n.alloc_memory as i64 * BASIS_POINTS) / n.total_memory.max(1) as i64
            }
            BalanceMode::Cpu => (n.alloc_cpu as i64 * BASIS_POINTS) / n.total_cpu.max(1) as i64,
            BalanceMode::Count => n.vm_count as i64,
        }
    }

    /// Cluster-wide target utilization for the selected mode.
    pub fn target(&self) -> i64 {
        match self.mode {
            BalanceMode::Memory => {
                (self.snapshot.total_alloc_memory as i64 * BASIS_POINTS)
                    / self.snapshot.total_capacity_memory.max(1) as i64
            }
            BalanceMode::Cpu => {
                (self.snapshot.total_alloc_cpu as i64 * BASIS_POINTS)
                    / self.snapshot.total_capacity_cpu.max(1) as i64
            }
            BalanceMode::Count => {
                self.snapshot.total_vm_count as i64 / self.snapshot.node_count().max(1) as i64
            }
        }
    }

    /// The band around `target` within which a node is Balanced.
    pub fn threshold(&self) -> i64 {
        match self.mode {
            BalanceMode::Memory | BalanceMode::Cpu => (self.target() / 10).max(MIN_THRESHOLD_BP),
            BalanceMode::Count => 1,
        }
    }

    pub fn classify(&self, node: &str) -> Classification {
        let util = self.utilization_fixed(node);
        let target = self.target();
        match self.mode {
            BalanceMode::Count => {
                if util > target + 1 {
                    Classification::Overloaded
                } else if util < target - 1 {
                    Classification::Underloaded
                } else {
                    Classification::Balanced
                }
            }
            BalanceMode::Memory | BalanceMode::Cpu => {
                let threshold = self.threshold();
                if util - target > threshold {
                    Classification::Overloaded
                } else if target - util > threshold {
                    Classification::Underloaded
                } else {
                    Classification::Balanced
                }
            }
        }
    }

    pub fn needs_rebalance(&self) -> bool {
        self.snapshot
            .nodes
            .keys()
            .any(|name| self.classify(name) == Classification::Overloaded)
    }
}
