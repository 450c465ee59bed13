//! Wraps a real [`ClusterClient`] so `--dry-run` can exercise the planner
//! without issuing any migration against the control plane.

use async_trait::async_trait;
use rebalancer_common::Result;
use rebalancer_core::client::{ClusterClient, ExitStatus, NodeCapacity, TaskId, TaskState, VmId, VmRecord};

pub struct DryRunClient<'a> {
    inner: &'a dyn ClusterClient,
}

impl<'a> DryRunClient<'a> {
    pub fn new(inner: &'a dyn ClusterClient) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<'a> ClusterClient for DryRunClient<'a> {
    async fn list_nodes(&self) -> Result<Vec<String>> {
        self.inner.list_nodes().await
    }

    async fn node_status(&self, node: &str) -> Result<NodeCapacity> {
        self.inner.node_status(node).await
    }

    async fn list_vms(&self, node: &str) -> Result<Vec<VmRecord>> {
        self.inner.list_vms(node).await
    }

    async fn list_ha_resources(&self) -> Result<Vec<String>> {
        self.inner.list_ha_resources().await
    }

    async fn start_migration(
        &self,
        _source: &str,
        _vmid: VmId,
        _target: &str,
        _online: bool,
    ) -> Result<TaskId> {
        Ok(TaskId("dry-run".to_string()))
    }

    async fn task_status(&self, _node: &str, _task: &TaskId) -> Result<TaskState> {
        Ok(TaskState::Stopped { exit_status: ExitStatus::Ok })
    }
}
