//! The in-memory cluster model a rebalancing pass plans against (spec §3).
//!
//! A `ClusterSnapshot` is built once by the Inventory Collector, mutated in
//! place by the Planner after every successful migration, and discarded at
//! the end of the pass. Nothing here persists across passes.

use std::collections::HashMap;

use rebalancer_common::VmRuntimeStatus;

use crate::client::VmId;

/// A physical hypervisor host.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub total_memory: u64,
    pub total_cpu: u32,
    pub alloc_memory: u64,
    pub alloc_cpu: u32,
    pub vm_count: u32,
}

/// A virtual machine, uniquely identified cluster-wide.
#[derive(Debug, Clone)]
pub struct Vm {
    pub vmid: VmId,
    pub assigned_node: String,
    pub maxmem: u64,
    pub vcpus: u32,
    pub status: VmRuntimeStatus,
    pub is_ha: bool,
}

/// A snapshot of cluster allocation, valid for the duration of one pass.
#[derive(Debug, Clone)]
pub struct ClusterSnapshot {
    pub nodes: HashMap<String, Node>,
    pub vms: HashMap<VmId, Vm>,
    pub total_alloc_memory: u64,
    pub total_alloc_cpu: u64,
    pub total_vm_count: u32,
    pub total_capacity_memory: u64,
    pub total_capacity_cpu: u64,
}

impl ClusterSnapshot {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Reassign `vmid` from its current node to `dest`, keeping every
    /// derived total consistent (spec §3, "Invariants (for all snapshots,
    /// all modes): Conservation").
    pub fn apply_migration(&mut self, vmid: VmId, dest: &str) {
        let (maxmem, vcpus, source_name) = {
            let vm = self.vms.get(&vmid).expect("vmid must exist in snapshot");
            (vm.maxmem, vm.vcpus, vm.assigned_node.clone())
        };

        if let Some(source) = self.nodes.get_mut(&source_name) {
            source.alloc_memory = source.alloc_memory.saturating_sub(maxmem);
            source.alloc_cpu = source.alloc_cpu.saturating_sub(vcpus);
            source.vm_count = source.vm_count.saturating_sub(1);
        }
        if let Some(target) = self.nodes.get_mut(dest) {
            target.alloc_memory += maxmem;
            target.alloc_cpu += vcpus;
            target.vm_count += 1;
        }
        if let Some(vm) = self.vms.get_mut(&vmid) {
            vm.assigned_node = dest.to_string();
        }
    }

    /// Drop a VM from further consideration this pass without moving it —
    /// used when a migration fails or times out (spec §4.E, §7).
    pub fn exclude_vm(&mut self, vmid: VmId) {
        self.vms.remove(&vmid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClusterSnapshot {
        let mut nodes = HashMap::new();
        nodes.insert(
            "a".to_string(),
            Node { name: "a".into(), total_memory: 100, total_cpu: 4, alloc_memory: 20, alloc_cpu: 1, vm_count: 1 },
        );
        nodes.insert(
            "b".to_string(),
            Node { name: "b".into(), total_memory: 100, total_cpu: 4, alloc_memory: 0, alloc_cpu: 0, vm_count: 0 },
        );
        let mut vms = HashMap::new();
        vms.insert(1, Vm { vmid: 1, assigned_node: "a".into(), maxmem: 20, vcpus: 1, status: VmRuntimeStatus::Stopped, is_ha: false });
        ClusterSnapshot {
            nodes,
            vms,
            total_alloc_memory: 20,
            total_alloc_cpu: 1,
            total_vm_count: 1,
            total_capacity_memory: 200,
            total_capacity_cpu: 8,
        }
    }

    #[test]
    fn apply_migration_moves_allocation_and_reassigns_vm() {
        let mut snap = sample();
        snap.apply_migration(1, "b");
        assert_eq!(snap.nodes["a"].alloc_memory, 0);
        assert_eq!(snap.nodes["b"].alloc_memory, 20);
        assert_eq!(snap.vms[&1].assigned_node, "b");
    }

    #[test]
    fn exclude_vm_removes_it_from_planning_without_touching_allocation() {
        let mut snap = sample();
        snap.exclude_vm(1);
        assert!(!snap.vms.contains_key(&1));
        assert_eq!(snap.nodes["a"].alloc_memory, 20, "node allocation reflects reality, not planning exclusion");
    }
}
