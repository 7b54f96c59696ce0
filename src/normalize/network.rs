// ABOUTME: Network normalizer for API objects and `network inspect`/`ls` JSON lines.
// ABOUTME: Reads Docker's IPAM block and Podman's subnet list into one IpamRecord.

use super::fields::{FlexBool, FlexTime, LabelSet};
use super::{Listing, NormalizeError, each_line, each_object, non_empty};
use crate::diagnostics::Diagnostics;
use crate::records::{IpamRecord, NetworkRecord, Scope};
use crate::transport::{RawResult, StructuredPayload};
use crate::types::{NetworkId, ResourceKind};
use bollard::models::Network;
use serde::Deserialize;

pub fn networks(raw: RawResult) -> Result<Listing<NetworkRecord>, NormalizeError> {
    let mut diagnostics = Diagnostics::default();
    let records = match raw {
        RawResult::Structured(StructuredPayload::Networks(networks)) => {
            each_object(networks, ResourceKind::Network, &mut diagnostics, |n, _| {
                from_api(n)
            })
        }
        RawResult::Lines(text) => {
            each_line(&text, ResourceKind::Network, &mut diagnostics, |l, _| {
                from_line(l)
            })
        }
        other => return Err(NormalizeError::unexpected("network list", &other)),
    };
    Ok(Listing::new(records, &diagnostics))
}

fn ipam(subnet: Option<String>, gateway: Option<String>) -> Option<IpamRecord> {
    let subnet = non_empty(subnet);
    let gateway = non_empty(gateway);
    if subnet.is_none() && gateway.is_none() {
        return None;
    }
    Some(IpamRecord { subnet, gateway })
}

fn from_api(network: Network) -> Result<NetworkRecord, String> {
    let id = non_empty(network.id).ok_or("missing ID")?;
    let name = non_empty(network.name).ok_or("missing name")?;

    let ipam = network
        .ipam
        .and_then(|i| i.config)
        .and_then(|configs| configs.into_iter().next())
        .and_then(|config| ipam(config.subnet, config.gateway));

    Ok(NetworkRecord {
        id: NetworkId::new(id),
        name,
        driver: network.driver.unwrap_or_default(),
        scope: Scope::from_runtime(network.scope.as_deref().unwrap_or_default()),
        internal: network.internal.unwrap_or(false),
        ipv6_enabled: network.enable_ipv6.unwrap_or(false),
        created_at: network.created.and_then(super::time::known),
        ipam,
        labels: network.labels.unwrap_or_default().into_iter().collect(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct IpamConfigLine {
    #[serde(rename = "Subnet", alias = "subnet", default)]
    subnet: Option<String>,
    #[serde(rename = "Gateway", alias = "gateway", default)]
    gateway: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IpamLine {
    #[serde(rename = "Config", default)]
    config: Option<Vec<IpamConfigLine>>,
}

/// Docker inspect, Docker `network ls`, or Podman inspect.
#[derive(Debug, Deserialize)]
struct NetworkLine {
    #[serde(rename = "Id", alias = "ID", alias = "id")]
    id: String,
    #[serde(rename = "Name", alias = "name")]
    name: String,
    #[serde(rename = "Driver", alias = "driver", default)]
    driver: String,
    #[serde(rename = "Scope", default)]
    scope: String,
    #[serde(rename = "Internal", alias = "internal", default)]
    internal: Option<FlexBool>,
    #[serde(rename = "EnableIPv6", alias = "IPv6", alias = "ipv6_enabled", default)]
    ipv6: Option<FlexBool>,
    #[serde(rename = "Created", alias = "CreatedAt", alias = "created", default)]
    created: Option<FlexTime>,
    #[serde(rename = "IPAM", default)]
    ipam: Option<IpamLine>,
    #[serde(default)]
    subnets: Option<Vec<IpamConfigLine>>,
    #[serde(rename = "Labels", alias = "labels", default)]
    labels: Option<LabelSet>,
}

fn from_line(line: NetworkLine) -> Result<NetworkRecord, String> {
    if line.id.trim().is_empty() {
        return Err("missing ID".to_string());
    }
    if line.name.trim().is_empty() {
        return Err("missing name".to_string());
    }

    let first = line
        .ipam
        .and_then(|i| i.config)
        .or(line.subnets)
        .and_then(|configs| configs.into_iter().next())
        .unwrap_or_default();

    Ok(NetworkRecord {
        id: NetworkId::new(line.id.trim()),
        name: line.name,
        driver: line.driver,
        scope: Scope::from_runtime(&line.scope),
        internal: line.internal.is_some_and(|b| b.value()),
        ipv6_enabled: line.ipv6.is_some_and(|b| b.value()),
        created_at: line.created.and_then(|t| t.instant()),
        ipam: ipam(first.subnet, first.gateway),
        labels: line.labels.map(LabelSet::into_map).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_inspect_line() {
        let line = r#"{"Name":"backend","Id":"7e7a","Created":"2023-11-14T22:13:20.000000000Z","Scope":"local","Driver":"bridge","EnableIPv6":false,"IPAM":{"Driver":"default","Options":{},"Config":[{"Subnet":"10.10.0.0/24","Gateway":"10.10.0.1"}]},"Internal":true,"Attachable":false,"Containers":{},"Options":{},"Labels":{"tier":"db"}}"#;

        let listing = networks(RawResult::Lines(line.to_string())).unwrap();
        let network = &listing.records[0];

        assert_eq!(network.name, "backend");
        assert!(network.internal);
        assert_eq!(network.scope, Scope::Local);
        assert_eq!(
            network.ipam,
            Some(IpamRecord {
                subnet: Some("10.10.0.0/24".to_string()),
                gateway: Some("10.10.0.1".to_string()),
            })
        );
        assert_eq!(network.labels["tier"], "db");
    }

    #[test]
    fn docker_ls_line_has_string_flags_and_no_ipam() {
        let line = r#"{"CreatedAt":"2023-11-14 22:13:20.123456789 +0000 UTC","Driver":"bridge","ID":"7e7a","IPv6":"true","Internal":"false","Labels":"","Name":"bridge","Scope":"local"}"#;

        let listing = networks(RawResult::Lines(line.to_string())).unwrap();
        let network = &listing.records[0];

        assert!(network.ipv6_enabled);
        assert!(!network.internal);
        assert_eq!(network.ipam, None);
        assert!(network.labels.is_empty());
        assert_eq!(network.created_at.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn podman_inspect_line() {
        let line = r#"{"name":"podman","id":"2f25","driver":"bridge","network_interface":"podman0","created":"2023-11-14T22:13:20Z","subnets":[{"subnet":"10.88.0.0/16","gateway":"10.88.0.1"}],"ipv6_enabled":false,"internal":false,"dns_enabled":false,"labels":{}}"#;

        let listing = networks(RawResult::Lines(line.to_string())).unwrap();
        let network = &listing.records[0];

        assert_eq!(network.id.as_str(), "2f25");
        assert_eq!(
            network.ipam.as_ref().and_then(|i| i.subnet.as_deref()),
            Some("10.88.0.0/16")
        );
    }
}
