//! Drives a single migration through its asynchronous task lifecycle
//! (spec §4.E).
//!
//! ```text
//!   Requested ──► Submitted ──► Running ──► Completed(OK)     = Success
//!                     │            │   └──► Completed(err)    = MigrationFailed
//!                     │            └──► (poll deadline)       = Timeout
//!                     └──► (no task id)                       = StartFailed
//! ```

use std::time::Duration;

use rebalancer_common::{Result, VmRuntimeStatus};
use tokio::time::Instant;
use tracing::debug;

use crate::client::{ClusterClient, ExitStatus, TaskState, VmId};

const POLL_INTERVAL: Duration = Duration::from_secs(3);
const ORDINARY_TIMEOUT: Duration = Duration::from_secs(120);
const HA_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Success,
    StartFailed(String),
    Failed(String),
    Timeout,
}

pub struct MigrationSupervisor;

impl MigrationSupervisor {
    /// Issues a migration request and polls it to a terminal state. Never
    /// force-aborts on timeout — the migration may yet succeed
    /// asynchronously, so the caller must not mutate its snapshot for this
    /// VM on a `Timeout` outcome.
    pub async fn execute(
        client: &dyn ClusterClient,
        source: &str,
        target: &str,
        vmid: VmId,
        vm_status: VmRuntimeStatus,
        is_ha: bool,
    ) -> Result<MigrationOutcome> {
        let online = vm_status == VmRuntimeStatus::Running;
        let task = match client.start_migration(source, vmid, target, online).await {
            Ok(task) => task,
            Err(e) => return Ok(MigrationOutcome::StartFailed(e.to_string())),
        };

        let timeout = if is_ha { HA_TIMEOUT } else { ORDINARY_TIMEOUT };
        let deadline = Instant::now() + timeout;

        loop {
            let status = match client.task_status(source, &task).await {
                Ok(status) => status,
                Err(e) => return Ok(MigrationOutcome::Failed(e.to_string())),
            };
            match status {
                TaskState::Running => {
                    debug!(vmid = vmid, "migration task still running");
                }
                TaskState::Stopped { exit_status: ExitStatus::Ok } => {
                    return Ok(MigrationOutcome::Success);
                }
                TaskState::Stopped { exit_status: ExitStatus::Error(msg) } => {
                    return Ok(MigrationOutcome::Failed(msg));
                }
            }

            if Instant::now() >= deadline {
                return Ok(MigrationOutcome::Timeout);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())))
                .await;
        }
    }
}
