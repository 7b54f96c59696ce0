// ABOUTME: Field shapes that differ between Docker and Podman command-line output.
// ABOUTME: Comma-joined strings versus arrays and maps, the port column, and repo tags.

use crate::records::{NONE_SENTINEL, PublishedPort};
use crate::types::Protocol;
use serde::Deserialize;
use std::collections::BTreeMap;

/// `"a,b"` from Docker or `["a", "b"]` from Podman.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    Text(String),
    List(Vec<String>),
}

impl StringList {
    pub fn items(&self) -> Vec<String> {
        match self {
            StringList::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            StringList::List(items) => items.clone(),
        }
    }
}

/// `"k=v,k2=v2"` from Docker or `{"k": "v"}` from Podman.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LabelSet {
    Text(String),
    Map(BTreeMap<String, String>),
}

impl LabelSet {
    /// A comma inside a Docker label value is indistinguishable from a
    /// separator; such values are split.
    pub fn into_map(self) -> BTreeMap<String, String> {
        match self {
            LabelSet::Map(map) => map,
            LabelSet::Text(text) => text
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|pair| match pair.split_once('=') {
                    Some((k, v)) => (k.trim().to_string(), v.to_string()),
                    None => (pair.trim().to_string(), String::new()),
                })
                .collect(),
        }
    }
}

/// `true` or `"true"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlexBool {
    Bool(bool),
    Text(String),
}

impl FlexBool {
    pub fn value(&self) -> bool {
        match self {
            FlexBool::Bool(b) => *b,
            FlexBool::Text(text) => text.trim().eq_ignore_ascii_case("true"),
        }
    }
}

/// `1700000000` or `"1700000000"` or `"2023-11-14 22:13:20 +0000 UTC"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlexTime {
    Epoch(i64),
    Text(String),
}

impl FlexTime {
    pub fn instant(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        match self {
            FlexTime::Epoch(seconds) => super::time::from_epoch(*seconds),
            FlexTime::Text(text) => super::time::parse_timestamp(text),
        }
    }
}

/// Podman's structured port entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PodmanPort {
    #[serde(default)]
    pub host_ip: String,
    pub container_port: u16,
    #[serde(default)]
    pub host_port: u16,
    #[serde(default = "one")]
    pub range: u16,
    #[serde(default)]
    pub protocol: String,
}

fn one() -> u16 {
    1
}

/// The port column in either runtime's form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortColumn {
    Text(String),
    List(Vec<PodmanPort>),
}

impl PortColumn {
    pub fn ports(&self) -> Result<Vec<PublishedPort>, String> {
        match self {
            PortColumn::Text(text) => parse_port_column(text),
            PortColumn::List(entries) => {
                let mut ports = Vec::new();
                for entry in entries {
                    let protocol = Protocol::from_runtime(&entry.protocol)
                        .ok_or_else(|| format!("unknown protocol {:?}", entry.protocol))?;
                    for offset in 0..entry.range.max(1) {
                        ports.push(PublishedPort {
                            host_ip: non_empty(&entry.host_ip),
                            host_port: (entry.host_port != 0)
                                .then(|| entry.host_port.saturating_add(offset)),
                            container_port: entry.container_port.saturating_add(offset),
                            protocol,
                        });
                    }
                }
                Ok(ports)
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_range(text: &str) -> Result<(u16, u16), String> {
    let parse = |s: &str| {
        s.trim()
            .parse::<u16>()
            .map_err(|_| format!("invalid port {s:?}"))
    };
    match text.split_once('-') {
        Some((start, end)) => {
            let (start, end) = (parse(start)?, parse(end)?);
            if end < start {
                return Err(format!("invalid port range {text:?}"));
            }
            Ok((start, end))
        }
        None => {
            let port = parse(text)?;
            Ok((port, port))
        }
    }
}

/// Parse the CLI port column, e.g.
/// `0.0.0.0:8080->80/tcp, [::]:8080->80/tcp, 443/tcp`.
pub fn parse_port_column(text: &str) -> Result<Vec<PublishedPort>, String> {
    let mut ports = Vec::new();

    for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (host, container) = match entry.split_once("->") {
            Some((host, container)) => (Some(host), container),
            None => (None, entry),
        };

        let (container_ports, protocol) = match container.split_once('/') {
            Some((ports, proto)) => (ports, proto),
            None => (container, "tcp"),
        };
        let protocol = Protocol::from_runtime(protocol)
            .ok_or_else(|| format!("unknown protocol in {entry:?}"))?;
        let (c_start, c_end) = parse_range(container_ports)?;

        let (host_ip, host_start) = match host {
            Some(host) => {
                let (ip, port) = host
                    .rsplit_once(':')
                    .ok_or_else(|| format!("missing host port in {entry:?}"))?;
                let ip = ip.trim_start_matches('[').trim_end_matches(']');
                (non_empty(ip), Some(parse_range(port)?.0))
            }
            None => (None, None),
        };

        for offset in 0..=(c_end - c_start) {
            ports.push(PublishedPort {
                host_ip: host_ip.clone(),
                host_port: host_start.map(|p| p.saturating_add(offset)),
                container_port: c_start + offset,
                protocol,
            });
        }
    }

    Ok(ports)
}

/// Split `repository:tag` on the last colon after the last slash, so a
/// registry port is never mistaken for a tag.
pub fn split_repo_tag(repo_tag: &str) -> (String, String) {
    let repo_tag = repo_tag.trim();
    if repo_tag.is_empty() {
        return (NONE_SENTINEL.to_string(), NONE_SENTINEL.to_string());
    }
    let name_start = repo_tag.rfind('/').map_or(0, |i| i + 1);
    match repo_tag[name_start..].rfind(':') {
        Some(i) => {
            let split = name_start + i;
            (
                repo_tag[..split].to_string(),
                repo_tag[split + 1..].to_string(),
            )
        }
        None => (repo_tag.to_string(), NONE_SENTINEL.to_string()),
    }
}

/// Docker's `--no-trunc` listing wraps the command in double quotes.
pub fn unquote_command(command: &str) -> String {
    let command = command.trim();
    command
        .strip_prefix('"')
        .and_then(|c| c.strip_suffix('"'))
        .unwrap_or(command)
        .to_string()
}
