// ABOUTME: Removal requests for any resource kind.
// ABOUTME: Force is only ever what the caller asked for.

use super::{Checks, ImageTarget, ValidationError};
use crate::types::{ResourceKind, ResourceName};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoveRequest {
    #[serde(alias = "id", alias = "name")]
    pub target: String,
    #[serde(default)]
    pub force: bool,
}

impl RemoveRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            force: false,
        }
    }

    pub fn forced(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            force: true,
        }
    }

    /// Containers and networks take a name or ID, volumes a name, images a
    /// reference or ID.
    pub fn validate(&self, kind: ResourceKind) -> Result<RemoveTarget, ValidationError> {
        let mut checks = Checks::default();
        let target = match kind {
            ResourceKind::Image => checks
                .check("target", ImageTarget::parse(&self.target))
                .map(RemoveTarget::Image),
            _ => checks.name("target", &self.target).map(RemoveTarget::Named),
        };
        checks.finish(|| target)
    }
}

/// A validated removal target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveTarget {
    Named(ResourceName),
    Image(ImageTarget),
}

impl fmt::Display for RemoveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoveTarget::Named(name) => write!(f, "{name}"),
            RemoveTarget::Image(target) => write!(f, "{target}"),
        }
    }
}
