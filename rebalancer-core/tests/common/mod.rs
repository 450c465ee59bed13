//! A fake [`ClusterClient`] used across the scenario tests in
//! `scenarios.rs`, standing in for the Proxmox VE control plane the real
//! `rebalancer-cli::ProxmoxClient` talks to.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rebalancer_common::{Error, Result, VmRuntimeStatus};
use rebalancer_core::client::{
    ClusterClient, ExitStatus, NodeCapacity, TaskId, TaskState, VmId, VmRecord,
};

#[derive(Clone, Copy, Debug)]
pub enum VmBehavior {
    Success,
    StartFailed,
    MigrationFailed,
    Timeout,
    PollError,
}

pub struct FakeVm {
    pub node: String,
    pub maxmem: u64,
    pub vcpus: u32,
    pub status: VmRuntimeStatus,
}

pub struct FakeClusterClient {
    pub node_capacity: HashMap<String, NodeCapacity>,
    pub vms: Mutex<HashMap<VmId, FakeVm>>,
    pub ha: Vec<VmId>,
    pub behaviors: HashMap<VmId, VmBehavior>,
}

impl FakeClusterClient {
    pub fn new() -> Self {
        Self {
            node_capacity: HashMap::new(),
            vms: Mutex::new(HashMap::new()),
            ha: Vec::new(),
            behaviors: HashMap::new(),
        }
    }

    pub fn with_node(mut self, name: &str, total_memory: u64, total_cpu: u32) -> Self {
        self.node_capacity
            .insert(name.to_string(), NodeCapacity { total_memory, total_cpu });
        self
    }

    pub fn with_vm(self, vmid: VmId, node: &str, maxmem: u64, vcpus: u32) -> Self {
        self.vms.lock().unwrap().insert(
            vmid,
            FakeVm { node: node.to_string(), maxmem, vcpus, status: VmRuntimeStatus::Stopped },
        );
        self
    }

    pub fn with_behavior(mut self, vmid: VmId, behavior: VmBehavior) -> Self {
        self.behaviors.insert(vmid, behavior);
        self
    }

    pub fn with_ha(mut self, vmid: VmId) -> Self {
        self.ha.push(vmid);
        self
    }

    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.node_capacity.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn list_nodes(&self) -> Result<Vec<String>> {
        Ok(self.node_names())
    }

    async fn node_status(&self, node: &str) -> Result<NodeCapacity> {
        self.node_capacity
            .get(node)
            .copied()
            .ok_or_else(|| Error::NotFound(node.to_string()))
    }

    async fn list_vms(&self, node: &str) -> Result<Vec<VmRecord>> {
        let vms = self.vms.lock().unwrap();
        Ok(vms
            .iter()
            .filter(|(_, v)| v.node == node)
            .map(|(vmid, v)| VmRecord {
                vmid: *vmid,
                maxmem: v.maxmem,
                vcpus: v.vcpus,
                status: v.status,
            })
            .collect())
    }

    async fn list_ha_resources(&self) -> Result<Vec<String>> {
        Ok(self.ha.iter().map(|id| format!("vm:{id}")).collect())
    }

    async fn start_migration(
        &self,
        _source: &str,
        vmid: VmId,
        _target: &str,
        _online: bool,
    ) -> Result<TaskId> {
        match self.behaviors.get(&vmid).copied().unwrap_or(VmBehavior::Success) {
            VmBehavior::StartFailed => Err(Error::RemoteError("control plane rejected migrate".into())),
            _ => Ok(TaskId(format!("task-{vmid}"))),
        }
    }

    async fn task_status(&self, _node: &str, task: &TaskId) -> Result<TaskState> {
        let vmid: VmId = task
            .0
            .strip_prefix("task-")
            .expect("fake task id")
            .parse()
            .expect("numeric vmid");
        match self.behaviors.get(&vmid).copied().unwrap_or(VmBehavior::Success) {
            VmBehavior::Success => Ok(TaskState::Stopped { exit_status: ExitStatus::Ok }),
            VmBehavior::MigrationFailed => {
                Ok(TaskState::Stopped { exit_status: ExitStatus::Error("qmp error".into()) })
            }
            VmBehavior::Timeout => Ok(TaskState::Running),
            VmBehavior::PollError => Err(Error::Unavailable("control plane unreachable".into())),
            VmBehavior::StartFailed => unreachable!("start_migration already failed"),
        }
    }
}
