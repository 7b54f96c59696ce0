// ABOUTME: Volume create requests and their validated form.
// ABOUTME: Volumes are keyed by name, so the name is the only required field.

use super::{Checks, ValidationError};
use crate::types::ResourceName;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeRequest {
    #[serde(alias = "volumeName")]
    pub name: String,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default, alias = "driverOpts")]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl VolumeRequest {
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

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<VolumeSpec, ValidationError> {
        let mut checks = Checks::default();

        let name = checks.name("name", &self.name);
        let driver = match self.driver.as_deref().map(str::trim) {
            Some(driver) if !driver.is_empty() => checks.name("driver", driver).map(Some),
            _ => Some(None),
        };
        checks.labels("labels", &self.labels);
        checks.options("options", &self.options);

        checks.finish(|| {
            Some(VolumeSpec {
                name: name?,
                driver: driver?,
                options: self.options.clone(),
                labels: self.labels.clone(),
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    pub name: ResourceName,
    pub driver: Option<ResourceName>,
    pub options: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}
