// ABOUTME: Runtime flavour, endpoint, and transport kind definitions.
// ABOUTME: Shared by detection, configuration, and the transport backends.

use serde::{Deserialize, Serialize};

/// The container runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Docker,
    Podman,
}

impl RuntimeType {
    /// Default command-line tool for this runtime.
    pub fn binary(&self) -> &'static str {
        match self {
            RuntimeType::Docker => "docker",
            RuntimeType::Podman => "podman",
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

/// Where a runtime's control socket lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub runtime_type: RuntimeType,
    pub socket_path: String,
}

/// Which backend carries requests to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Structured client over the control socket.
    #[default]
    Socket,
    /// The runtime's command-line tool, one child process per call.
    Cli,
    /// In-process emulation with no runtime behind it.
    Memory,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Socket => write!(f, "socket"),
            TransportKind::Cli => write!(f, "cli"),
            TransportKind::Memory => write!(f, "memory"),
        }
    }
}
