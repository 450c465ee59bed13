//! A [`ClusterClient`] backed by the Proxmox VE REST API.
//!
//! This is the only piece of the CLI shell that talks to the hypervisor
//! control plane; the engine itself never sees an HTTP request (spec §4.A).
//! Credentials are read from the environment, outside the engine's concern.

use async_trait::async_trait;
use rebalancer_common::{Error, Result, VmRuntimeStatus};
use rebalancer_core::client::{ClusterClient, ExitStatus, NodeCapacity, TaskId, TaskState, VmId, VmRecord};
use serde::Deserialize;

pub struct ProxmoxClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl ProxmoxClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            http: reqwest::Client::builder()
                .danger_accept_invalid_certs(true)
                .build()
                .expect("reqwest client"),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http
            .request(method, url)
            .header("Authorization", format!("PVEAPIToken={}", self.token))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Self::unwrap_data(resp).await
    }

    async fn unwrap_data<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(status.to_string()));
        }
        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::PermissionDenied(status.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::RemoteError(format!("{status}: {body}")));
        }
        #[derive(Deserialize)]
        struct Envelope<T> {
            data: T,
        }
        let envelope: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| Error::RemoteError(e.to_string()))?;
        Ok(envelope.data)
    }
}

#[derive(Deserialize)]
struct NodeEntry {
    node: String,
}

#[derive(Deserialize)]
struct NodeStatusResponse {
    memory: NodeMemory,
    cpuinfo: NodeCpuInfo,
}

#[derive(Deserialize)]
struct NodeMemory {
    total: u64,
}

#[derive(Deserialize)]
struct NodeCpuInfo {
    cpus: u32,
}

#[derive(Deserialize)]
struct QemuEntry {
    vmid: u32,
    maxmem: u64,
    #[serde(default)]
    cpus: Option<u32>,
    #[serde(default)]
    maxcpu: Option<u32>,
    status: String,
}

#[derive(Deserialize)]
struct HaResourceEntry {
    sid: String,
}

#[derive(Deserialize)]
struct TaskStatusResponse {
    status: String,
    #[serde(default)]
    exitstatus: Option<String>,
}

#[async_trait]
impl ClusterClient for ProxmoxClient {
    async fn list_nodes(&self) -> Result<Vec<String>> {
        let entries: Vec<NodeEntry> = self.get("/api2/json/nodes").await?;
        Ok(entries.into_iter().map(|e| e.node).collect())
    }

    async fn node_status(&self, node: &str) -> Result<NodeCapacity> {
        let status: NodeStatusResponse = self
            .get(&format!("/api2/json/nodes/{node}/status"))
            .await?;
        Ok(NodeCapacity {
            total_memory: status.memory.total,
            total_cpu: status.cpuinfo.cpus,
        })
    }

    async fn list_vms(&self, node: &str) -> Result<Vec<VmRecord>> {
        let entries: Vec<QemuEntry> = self.get(&format!("/api2/json/nodes/{node}/qemu")).await?;
        Ok(entries
            .into_iter()
            .map(|e| VmRecord {
                vmid: e.vmid,
                maxmem: e.maxmem,
                vcpus: e.cpus.or(e.maxcpu).unwrap_or(1),
                status: match e.status.as_str() {
                    "running" => VmRuntimeStatus::Running,
                    "stopped" => VmRuntimeStatus::Stopped,
                    "paused" => VmRuntimeStatus::Paused,
                    _ => VmRuntimeStatus::Unknown,
                },
            })
            .collect())
    }

    async fn list_ha_resources(&self) -> Result<Vec<String>> {
        let entries: Vec<HaResourceEntry> =
            self.get("/api2/json/cluster/ha/resources").await?;
        Ok(entries.into_iter().map(|e| e.sid).collect())
    }

    async fn start_migration(
        &self,
        source: &str,
        vmid: VmId,
        target: &str,
        online: bool,
    ) -> Result<TaskId> {
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/api2/json/nodes/{source}/qemu/{vmid}/migrate"),
            )
            .form(&[("target", target), ("online", if online { "1" } else { "0" })])
            .send()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        let upid: String = Self::unwrap_data(resp).await?;
        Ok(TaskId(upid))
    }

    async fn task_status(&self, node: &str, task: &TaskId) -> Result<TaskState> {
        let status: TaskStatusResponse = self
            .get(&format!("/api2/json/nodes/{node}/tasks/{}/status", task.0))
            .await?;
        match status.status.as_str() {
            "running" => Ok(TaskState::Running),
            "stopped" => Ok(TaskState::Stopped {
                exit_status: match status.exitstatus.as_deref() {
                    Some("OK") => ExitStatus::Ok,
                    Some(other) => ExitStatus::Error(other.to_string()),
                    None => ExitStatus::Error("unknown".to_string()),
                },
            }),
            other => Err(Error::RemoteError(format!("unknown task status: {other}"))),
        }
    }
}
