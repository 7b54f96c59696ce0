// ABOUTME: Port publishing syntax: hostPort:containerPort[/protocol].
// ABOUTME: Both ports in 1..=65535, protocol tcp or udp, tcp by default.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Transport protocol of a published or exposed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    /// Parse a protocol as the runtime reports it. Empty means tcp.
    pub fn from_runtime(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "" | "tcp" => Some(Protocol::Tcp),
            "udp" => Some(Protocol::Udp),
            "sctp" => Some(Protocol::Sctp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortMappingError {
    #[error("port mapping cannot be empty")]
    Empty,

    #[error("expected hostPort:containerPort[/protocol], got {0:?}")]
    InvalidFormat(String),

    #[error("{role} port must be a number between 1 and 65535, got {value:?}")]
    InvalidPort { role: &'static str, value: String },

    #[error("protocol must be tcp or udp, got {0:?}")]
    InvalidProtocol(String),
}

/// A validated request to publish a container port on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: Protocol,
}

impl PortMapping {
    pub fn parse(input: &str) -> Result<Self, PortMappingError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PortMappingError::Empty);
        }

        let (ports, protocol) = match input.split_once('/') {
            Some((ports, proto)) => {
                let protocol = match proto {
                    "tcp" => Protocol::Tcp,
                    "udp" => Protocol::Udp,
                    other => return Err(PortMappingError::InvalidProtocol(other.to_string())),
                };
                (ports, protocol)
            }
            None => (input, Protocol::Tcp),
        };

        let parts: Vec<&str> = ports.split(':').collect();
        let [host, container] = parts.as_slice() else {
            return Err(PortMappingError::InvalidFormat(input.to_string()));
        };

        Ok(Self {
            host_port: parse_port("host", host)?,
            container_port: parse_port("container", container)?,
            protocol,
        })
    }

    /// The `port/proto` key the engine API uses for exposed ports.
    pub fn container_key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol)
    }
}

fn parse_port(role: &'static str, value: &str) -> Result<u16, PortMappingError> {
    let invalid = || PortMappingError::InvalidPort {
        role,
        value: value.to_string(),
    };
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(invalid()),
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}",
            self.host_port, self.container_port, self.protocol
        )
    }
}
