// ABOUTME: Transport section of the configuration file.
// ABOUTME: Picks the backend and, optionally, the runtime, socket, and CLI binary.

use crate::transport::{RuntimeType, TransportKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,

    /// Detected from the local system when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeType>,

    /// Control socket path for the socket transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,

    /// Command-line tool for the cli transport; defaults to the runtime name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,

    /// Verify registry certificates on Podman pulls.
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
}

fn default_tls_verify() -> bool {
    true
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            kind: TransportKind::default(),
            runtime: None,
            socket: None,
            binary: None,
            tls_verify: default_tls_verify(),
        }
    }
}
