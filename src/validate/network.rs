// ABOUTME: Network create requests and their validated form.
// ABOUTME: Checks name, driver, labels, driver options, and the IPAM subnet and gateway.

use super::{Checks, ValidationError};
use crate::types::ResourceName;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A network create request as callers send it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequest {
    #[serde(alias = "networkName")]
    pub name: String,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub internal: bool,
    #[serde(default, alias = "ipv6")]
    pub enable_ipv6: bool,
    #[serde(default)]
    pub attachable: bool,
    #[serde(default)]
    pub subnet: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl NetworkRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn subnet(mut self, subnet: impl Into<String>) -> Self {
        self.subnet = Some(subnet.into());
        self
    }

    pub fn gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = Some(gateway.into());
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<NetworkSpec, ValidationError> {
        let mut checks = Checks::default();

        let name = checks.name("name", &self.name);
        let driver = match non_blank(&self.driver) {
            Some(driver) => checks.name("driver", driver).map(Some),
            None => Some(None),
        };

        let subnet = match non_blank(&self.subnet) {
            Some(raw) => checks.check("subnet", Subnet::from_str(raw)).map(Some),
            None => Some(None),
        };

        let gateway = match non_blank(&self.gateway) {
            Some(raw) => {
                let parsed = checks.check(
                    "gateway",
                    raw.parse::<IpAddr>()
                        .map_err(|_| format!("invalid IP address: {raw:?}")),
                );
                match (&subnet, parsed) {
                    (Some(None), Some(_)) => {
                        checks.fail("gateway", "a gateway requires a subnet");
                        None
                    }
                    (Some(Some(subnet)), Some(ip)) if !subnet.contains(ip) => {
                        checks.fail("gateway", format!("{ip} is outside subnet {subnet}"));
                        None
                    }
                    (_, parsed) => parsed.map(Some),
                }
            }
            None => Some(None),
        };

        checks.labels("labels", &self.labels);
        checks.options("options", &self.options);

        checks.finish(|| {
            let subnet = subnet?;
            let gateway = gateway?;
            Some(NetworkSpec {
                name: name?,
                driver: driver?,
                internal: self.internal,
                enable_ipv6: self.enable_ipv6,
                attachable: self.attachable,
                ipam: subnet.map(|subnet| IpamSpec { subnet, gateway }),
                labels: self.labels.clone(),
                options: self.options.clone(),
            })
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// A network create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSpec {
    pub name: ResourceName,
    pub driver: Option<ResourceName>,
    pub internal: bool,
    pub enable_ipv6: bool,
    pub attachable: bool,
    pub ipam: Option<IpamSpec>,
    pub labels: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpamSpec {
    pub subnet: Subnet,
    pub gateway: Option<IpAddr>,
}

/// An address block in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    pub address: IpAddr,
    pub prefix: u8,
}

impl Subnet {
    fn contains(&self, ip: IpAddr) -> bool {
        match (self.address, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = u32::MAX.checked_shl(32 - u32::from(self.prefix)).unwrap_or(0);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = u128::MAX.checked_shl(128 - u32::from(self.prefix)).unwrap_or(0);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

impl FromStr for Subnet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("expected address/prefix, got {s:?}");
        let (address, prefix) = s.split_once('/').ok_or_else(invalid)?;
        let address: IpAddr = address.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = if address.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(format!("prefix /{prefix} is too long for {address}"));
        }
        Ok(Self { address, prefix })
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}
