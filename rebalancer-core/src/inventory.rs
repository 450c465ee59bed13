//! Snapshots node capacity, per-node allocation, VM list, and the HA set
//! into a [`ClusterSnapshot`] (spec §4.B).

use std::collections::HashMap;

use rebalancer_common::{Error, Result};
use tracing::warn;

use crate::client::{ClusterClient, NodeCapacity, VmRecord};
use crate::snapshot::{ClusterSnapshot, Node, Vm};

/// Non-fatal anomaly recorded during collection. These never abort a pass;
/// they are logged and carried into the pass summary (spec §7, "Collection").
#[derive(Debug, Clone)]
pub enum CollectWarning {
    /// A node's `NodeStatus`/`ListVMs` call failed; the node was included
    /// with zero allocations.
    NodeUnavailable { node: String, error: String },
    /// The same VM id was reported by two nodes — a race with an in-flight
    /// migration. The VM is assigned to whichever node reported it last.
    DuplicateVm { vmid: u32, lost_node: String, kept_node: String },
    /// A node reported zero or missing capacity for a resource; coerced to
    /// 1 to avoid division by zero downstream.
    ZeroCapacityCoerced { node: String, resource: &'static str },
}

pub struct CollectResult {
    pub snapshot: ClusterSnapshot,
    pub warnings: Vec<CollectWarning>,
}

/// Reads the cluster inventory once and assembles a [`ClusterSnapshot`].
pub struct InventoryCollector;

impl InventoryCollector {
    pub async fn collect(client: &dyn ClusterClient) -> Result<CollectResult> {
        let node_names = client.list_nodes().await?;
        if node_names.is_empty() {
            return Err(Error::Precondition("cluster has no nodes".into()));
        }

        let mut warnings = Vec::new();

        // NodeStatus/ListVMs may be issued in parallel; merge only after
        // every response has returned (spec §5, "Permitted parallelism").
        let fetches = node_names
            .iter()
            .map(|name| Self::fetch_node(client, name));
        let fetched = futures::future::join_all(fetches).await;

        let mut nodes = HashMap::new();
        let mut vms: HashMap<u32, Vm> = HashMap::new();
        let mut total_capacity_memory: u64 = 0;
        let mut total_capacity_cpu: u64 = 0;

        for (name, outcome) in node_names.into_iter().zip(fetched) {
            let (capacity, records) = match outcome {
                Ok(v) => v,
                Err(e) => {
                    warnings.push(CollectWarning::NodeUnavailable {
                        node: name.clone(),
                        error: e.to_string(),
                    });
                    (NodeCapacity { total_memory: 0, total_cpu: 0 }, Vec::new())
                }
            };

            let total_memory = if capacity.total_memory == 0 {
                warnings.push(CollectWarning::ZeroCapacityCoerced {
                    node: name.clone(),
                    resource: "memory",
                });
                1
            } else {
                capacity.total_memory
            };
            let total_cpu = if capacity.total_cpu == 0 {
                warnings.push(CollectWarning::ZeroCapacityCoerced {
                    node: name.clone(),
                    resource: "cpu",
                });
                1
            } else {
                capacity.total_cpu
            };

            let mut alloc_memory = 0u64;
            let mut alloc_cpu = 0u32;
            for rec in records {
                if let Some(existing) = vms.get(&rec.vmid) {
                    warnings.push(CollectWarning::DuplicateVm {
                        vmid: rec.vmid,
                        lost_node: existing.assigned_node.clone(),
                        kept_node: name.clone(),
                    });
                }
                alloc_memory += rec.maxmem;
                alloc_cpu += rec.vcpus;
                vms.insert(
                    rec.vmid,
                    Vm {
                        vmid: rec.vmid,
                        assigned_node: name.clone(),
                        maxmem: rec.maxmem,
                        vcpus: rec.vcpus,
                        status: rec.status,
                        is_ha: false,
                    },
                );
            }

            total_capacity_memory += total_memory;
            total_capacity_cpu += total_cpu as u64;

            nodes.insert(
                name.clone(),
                Node {
                    name,
                    total_memory,
                    total_cpu,
                    alloc_memory,
                    alloc_cpu,
                    vm_count: 0, // recomputed below once duplicates are resolved
                },
            );
        }

        // Recompute per-node vm_count/alloc from the deduplicated VM map so
        // a VM that lost a duplicate race doesn't double-count on its
        // original node.
        for node in nodes.values_mut() {
            node.alloc_memory = 0;
            node.alloc_cpu = 0;
            node.vm_count = 0;
        }
        let mut total_alloc_memory = 0u64;
        let mut total_alloc_cpu = 0u64;
        for vm in vms.values() {
            if let Some(node) = nodes.get_mut(&vm.assigned_node) {
                node.alloc_memory += vm.maxmem;
                node.alloc_cpu += vm.vcpus;
                node.vm_count += 1;
            }
            total_alloc_memory += vm.maxmem;
            total_alloc_cpu += vm.vcpus as u64;
        }

        let ha_resources = client.list_ha_resources().await?;
        let ha_ids: std::collections::HashSet<u32> = ha_resources
            .iter()
            .filter_map(|sid| sid.strip_prefix("vm:"))
            .filter_map(|id| id.parse().ok())
            .collect();
        for vm in vms.values_mut() {
            vm.is_ha = ha_ids.contains(&vm.vmid);
        }

        let total_vm_count = vms.len() as u32;

        for w in &warnings {
            match w {
                CollectWarning::NodeUnavailable { node, error } => {
                    warn!(node = %node, error = %error, "node collection failed, using zero allocations")
                }
                CollectWarning::DuplicateVm { vmid, lost_node, kept_node } => {
                    warn!(vmid = %vmid, lost_node = %lost_node, kept_node = %kept_node, "vm reported by two nodes, keeping latest")
                }
                CollectWarning::ZeroCapacityCoerced { node, resource } => {
                    warn!(node = %node, resource = %resource, "zero capacity coerced to 1")
                }
            }
        }

        Ok(CollectResult {
            snapshot: ClusterSnapshot {
                nodes,
                vms,
                total_alloc_memory,
                total_alloc_cpu,
                total_vm_count,
                total_capacity_memory,
                total_capacity_cpu,
            },
            warnings,
        })
    }

    async fn fetch_node(
        client: &dyn ClusterClient,
        name: &str,
    ) -> Result<(NodeCapacity, Vec<VmRecord>)> {
        let capacity = client.node_status(name).await?;
        let vms = client.list_vms(name).await?;
        Ok((capacity, vms))
    }
}
