//! Common types and errors shared between the rebalancing engine and its CLI shell.

use serde::{Deserialize, Serialize};

/// Runtime status of a VM as reported by the hypervisor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VmRuntimeStatus {
    Running,
    Stopped,
    Paused,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for VmRuntimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Paused => write!(f, "paused"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The resource dimension a rebalancing pass targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BalanceMode {
    Memory,
    Cpu,
    Count,
}

impl std::str::FromStr for BalanceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(Self::Memory),
            "cpu" => Ok(Self::Cpu),
            "count" => Ok(Self::Count),
            other => Err(Error::InvalidArgument(format!("unknown mode: {other}"))),
        }
    }
}

impl std::fmt::Display for BalanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Cpu => write!(f, "cpu"),
            Self::Count => write!(f, "count"),
        }
    }
}

/// Errors produced by the ClusterClient capability and the engine itself.
///
/// The transport-level variants (`Unavailable`..`RemoteError`) are the
/// ClusterClient failure model from the spec; the engine-level variants
/// (`Precondition`..`Cancelled`) are the error taxonomy a pass reports.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cluster control plane unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("remote error: {0}")]
    RemoteError(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("migration start failed: {0}")]
    StartFailed(String),

    #[error("migration failed: {0}")]
    MigrationFailed(String),

    #[error("migration timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("pass cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
