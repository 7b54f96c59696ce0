// ABOUTME: Container normalizer for API summaries and `ps` JSON lines.
// ABOUTME: Maps runtime states, ports, sizes, names, and networks onto ContainerRecord.

use super::fields::{LabelSet, PortColumn, StringList, unquote_command};
use super::size::parse_container_size;
use super::{Listing, NormalizeError, each_line, each_object, non_empty};
use crate::diagnostics::{Diagnostics, Warning};
use crate::records::{ContainerRecord, ContainerState, PublishedPort};
use crate::transport::{RawResult, StructuredPayload};
use crate::types::{ContainerId, Protocol, ResourceKind};
use bollard::models::ContainerSummary;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;

pub fn containers(raw: RawResult) -> Result<Listing<ContainerRecord>, NormalizeError> {
    let mut diagnostics = Diagnostics::default();
    let records = match raw {
        RawResult::Structured(StructuredPayload::Containers(summaries)) => {
            each_object(summaries, ResourceKind::Container, &mut diagnostics, from_summary)
        }
        RawResult::Lines(text) => {
            each_line(&text, ResourceKind::Container, &mut diagnostics, from_line)
        }
        other => return Err(NormalizeError::unexpected("container list", &other)),
    };
    Ok(Listing::new(records, &diagnostics))
}

fn state(value: &str) -> Result<ContainerState, String> {
    ContainerState::from_runtime(value).ok_or_else(|| format!("unknown container state {value:?}"))
}

fn strip_slash(names: impl IntoIterator<Item = String>) -> Vec<String> {
    names
        .into_iter()
        .map(|n| n.trim_start_matches('/').to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

fn dedup(mut ports: Vec<PublishedPort>) -> Vec<PublishedPort> {
    ports.sort();
    ports.dedup();
    ports
}

fn from_summary(
    summary: ContainerSummary,
    diagnostics: &mut Diagnostics,
) -> Result<ContainerRecord, String> {
    let id = non_empty(summary.id).ok_or("missing ID")?;
    let state = state(&summary.state.map(|s| s.to_string()).unwrap_or_default())?;

    let mut ports = Vec::new();
    for port in summary.ports.unwrap_or_default() {
        let protocol = port
            .typ
            .map(|t| t.to_string())
            .unwrap_or_default();
        let Some(protocol) = Protocol::from_runtime(&protocol) else {
            diagnostics.warn(Warning::unreadable_field("port protocol", &protocol));
            continue;
        };
        ports.push(PublishedPort {
            host_ip: non_empty(port.ip),
            host_port: port.public_port.filter(|p| *p != 0),
            container_port: port.private_port,
            protocol,
        });
    }

    let networks: BTreeSet<String> = summary
        .network_settings
        .and_then(|settings| settings.networks)
        .map(|networks| networks.into_keys().collect())
        .unwrap_or_default();

    Ok(ContainerRecord {
        id: ContainerId::new(id),
        names: strip_slash(summary.names.unwrap_or_default()),
        image: summary.image.unwrap_or_default(),
        state,
        status: summary.status.unwrap_or_default(),
        created_at: summary.created.and_then(super::time::from_epoch),
        ports: dedup(ports),
        command: summary.command.unwrap_or_default(),
        size_rw: summary.size_rw.and_then(|s| u64::try_from(s).ok()),
        size_root_fs: summary.size_root_fs.and_then(|s| u64::try_from(s).ok()),
        networks,
        labels: summary.labels.unwrap_or_default().into_iter().collect(),
    })
}

/// One `ps --format '{{json .}}'` line from Docker or Podman.
#[derive(Debug, Deserialize)]
struct ContainerLine {
    #[serde(rename = "ID", alias = "Id")]
    id: String,
    #[serde(rename = "Names", default)]
    names: Option<StringList>,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "CreatedAt", default)]
    created_at: Option<super::fields::FlexTime>,
    /// Podman prints epoch seconds here and prose in `CreatedAt`.
    #[serde(rename = "Created", default)]
    created: Option<super::fields::FlexTime>,
    #[serde(rename = "Ports", default)]
    ports: Option<PortColumn>,
    #[serde(rename = "Command", default)]
    command: Option<StringList>,
    #[serde(rename = "Size", default)]
    size: Option<Value>,
    #[serde(rename = "Networks", default)]
    networks: Option<StringList>,
    #[serde(rename = "Labels", default)]
    labels: Option<LabelSet>,
}

fn from_line(line: ContainerLine, diagnostics: &mut Diagnostics) -> Result<ContainerRecord, String> {
    if line.id.trim().is_empty() {
        return Err("missing ID".to_string());
    }
    let state = state(&line.state)?;

    let ports = match line.ports.as_ref().map(PortColumn::ports).transpose() {
        Ok(ports) => ports.unwrap_or_default(),
        Err(reason) => {
            diagnostics.warn(Warning::unreadable_field("ports", reason));
            Vec::new()
        }
    };

    let command = match line.command {
        Some(StringList::Text(text)) => unquote_command(&text),
        Some(StringList::List(args)) => args.join(" "),
        None => String::new(),
    };

    let (size_rw, size_root_fs) = match line.size {
        Some(Value::String(text)) => parse_container_size(&text),
        Some(Value::Object(map)) => (
            map.get("rwSize").and_then(Value::as_u64),
            map.get("rootFsSize").and_then(Value::as_u64),
        ),
        _ => (None, None),
    };

    let created_at = line
        .created_at
        .as_ref()
        .and_then(|t| t.instant())
        .or_else(|| line.created.as_ref().and_then(|t| t.instant()));

    Ok(ContainerRecord {
        id: ContainerId::new(line.id.trim()),
        names: strip_slash(line.names.map(|n| n.items()).unwrap_or_default()),
        image: line.image,
        state,
        status: line.status,
        created_at,
        ports: dedup(ports),
        command,
        size_rw,
        size_root_fs,
        networks: line
            .networks
            .map(|n| n.items().into_iter().collect())
            .unwrap_or_default(),
        labels: line.labels.map(LabelSet::into_map).unwrap_or_default(),
    })
}
