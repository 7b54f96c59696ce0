// ABOUTME: List filters shared by all resource kinds.
// ABOUTME: Values are validated like any other input since they reach the command line.

use super::{Checks, ValidationError};
use crate::types::{ImageRef, ResourceName, check_label};
use serde::Deserialize;

/// Narrowing for a list call. Fields a kind does not support are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListFilter {
    /// Containers: include stopped ones. Images: include intermediate layers.
    #[serde(default)]
    pub all: bool,
    /// Containers: report writable-layer and root-filesystem sizes.
    #[serde(default)]
    pub size: bool,
    /// ID or ID prefix.
    #[serde(default)]
    pub id: Option<String>,
    /// Containers, networks, and volumes: exact name.
    #[serde(default)]
    pub name: Option<String>,
    /// Images: `repository:tag` or digest reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// `key` or `key=value`.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl ListFilter {
    pub fn all() -> Self {
        Self {
            all: true,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn with_size(mut self) -> Self {
        self.size = true;
        self
    }

    /// Split each label filter into key and optional value.
    pub fn label_pairs(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.labels.iter().map(|label| match label.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (label.as_str(), None),
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut checks = Checks::default();

        if let Some(id) = &self.id {
            let bare = id.strip_prefix("sha256:").unwrap_or(id);
            if bare.is_empty() || !bare.chars().all(|c| c.is_ascii_hexdigit()) {
                checks.fail("id", format!("expected a hex ID or prefix, got {id:?}"));
            }
        }
        if let Some(name) = &self.name {
            checks.check("name", ResourceName::new(name));
        }
        if let Some(reference) = &self.reference {
            checks.check("reference", ImageRef::parse(reference));
        }
        for (i, (key, value)) in self.label_pairs().enumerate() {
            checks.check(format!("labels[{i}]"), check_label(key, value.unwrap_or("")));
        }

        checks.finish(|| Some(()))
    }
}
