// ABOUTME: Canonical, transport-independent records for each resource kind.
// ABOUTME: Point-in-time snapshots, serialized camelCase for the presentation layer.

use crate::types::{ContainerId, ImageId, NetworkId, Protocol};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Container state as the runtime reports it. Observed, never computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

impl ContainerState {
    /// Map a runtime state string. Podman's extra states fold into the
    /// nearest Docker state.
    pub fn from_runtime(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "created" | "configured" | "initialized" => Some(ContainerState::Created),
            "running" | "stopping" => Some(ContainerState::Running),
            "paused" => Some(ContainerState::Paused),
            "restarting" => Some(ContainerState::Restarting),
            "removing" => Some(ContainerState::Removing),
            "exited" | "stopped" => Some(ContainerState::Exited),
            "dead" => Some(ContainerState::Dead),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Created => "created",
            ContainerState::Running => "running",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Removing => "removing",
            ContainerState::Exited => "exited",
            ContainerState::Dead => "dead",
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A port a container exposes, published on the host when `host_port` is set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPort {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    pub id: ContainerId,
    pub names: Vec<String>,
    pub image: String,
    pub state: ContainerState,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub ports: Vec<PublishedPort>,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_rw: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_root_fs: Option<u64>,
    pub networks: BTreeSet<String>,
    pub labels: BTreeMap<String, String>,
}

impl ContainerRecord {
    /// Whether `name` is one of this container's names.
    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Placeholder the runtime uses for an untagged repository or tag.
pub const NONE_SENTINEL: &str = "<none>";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: ImageId,
    pub repository: String,
    pub tag: String,
    /// Every `repository:tag` pointing at this image, in runtime order.
    pub repo_tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ImageId>,
    pub labels: BTreeMap<String, String>,
}

/// Network scope as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Local,
    Global,
    Swarm,
}

impl Scope {
    /// Blank and unrecognised scopes are local.
    pub fn from_runtime(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "swarm" => Scope::Swarm,
            "global" => Scope::Global,
            _ => Scope::Local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpamRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub id: NetworkId,
    pub name: String,
    pub driver: String,
    pub scope: Scope,
    pub internal: bool,
    pub ipv6_enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipam: Option<IpamRecord>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeRecord {
    /// Primary key; volumes have no separate ID.
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub labels: BTreeMap<String, String>,
    pub scope: Scope,
    pub created_at: Option<DateTime<Utc>>,
}

/// Engine-wide counts, host facts, and averaged usage for the dashboard.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSummary {
    pub containers: ContainerCounts,
    pub images: u64,
    pub volumes: u64,
    pub networks: u64,
    pub engine: EngineFacts,
    /// Mean CPU percent across running containers, two decimals.
    pub cpu_percent: f64,
    /// Mean memory percent across running containers, two decimals.
    pub memory_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerCounts {
    pub total: u64,
    pub running: u64,
    pub paused: u64,
    pub stopped: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineFacts {
    pub id: String,
    pub name: String,
    pub server_version: String,
    pub kernel_version: String,
    pub operating_system: String,
    pub architecture: String,
    pub cpus: u64,
    pub memory_bytes: u64,
}
