//! The capability the engine requires from the hypervisor control plane.
//!
//! This is the sole external collaborator the core depends on (spec §4.A).
//! Everything else — node listing, VM inventory, migration orchestration —
//! is driven entirely through this trait, so a test double satisfying it is
//! enough to exercise the whole engine.

use async_trait::async_trait;
use rebalancer_common::{Result, VmRuntimeStatus};

pub type NodeName = String;
pub type VmId = u32;

/// Hardware capacity reported by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeCapacity {
    pub total_memory: u64,
    pub total_cpu: u32,
}

/// A VM as enumerated under a node.
#[derive(Debug, Clone)]
pub struct VmRecord {
    pub vmid: VmId,
    pub maxmem: u64,
    pub vcpus: u32,
    pub status: VmRuntimeStatus,
}

/// Opaque handle to an in-flight migration task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(pub String);

/// Terminal or non-terminal state of a polled migration task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Stopped { exit_status: ExitStatus },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Ok,
    Error(String),
}

/// Read/write access to the hypervisor control plane (spec §4.A).
///
/// Read operations are idempotent; `start_migration` is not — callers must
/// not retry it blindly on ambiguous failures.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<NodeName>>;

    async fn node_status(&self, node: &str) -> Result<NodeCapacity>;

    async fn list_vms(&self, node: &str) -> Result<Vec<VmRecord>>;

    /// HA-managed resource identifiers, in the form `vm:<id>`.
    async fn list_ha_resources(&self) -> Result<Vec<String>>;

    async fn start_migration(
        &self,
        source: &str,
        vmid: VmId,
        target: &str,
        online: bool,
    ) -> Result<TaskId>;

    async fn task_status(&self, node: &str, task: &TaskId) -> Result<TaskState>;
}
