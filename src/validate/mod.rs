// ABOUTME: Caller-facing request types and their validation into typed specs.
// ABOUTME: Reports every failing field at once; nothing invalid reaches a transport.

mod container;
mod filter;
mod image;
mod network;
mod remove;
mod volume;

pub use container::{ContainerRequest, ContainerSpec};
pub use filter::ListFilter;
pub use image::{ImageRequest, ImageSpec, ImageTarget};
pub use network::{IpamSpec, NetworkRequest, NetworkSpec, Subnet};
pub use remove::{RemoveRequest, RemoveTarget};
pub use volume::{VolumeRequest, VolumeSpec};

use crate::types::{ResourceName, check_label};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// One field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path to the field, e.g. `ports[1]` or `labels.tier`.
    pub field: String,
    pub message: String,
}

/// All validation failures found in one request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("invalid request: {}", describe(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    /// Whether the named field failed.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}

fn describe(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accumulates field failures while a request is checked.
#[derive(Debug, Default)]
pub(crate) struct Checks {
    fields: Vec<FieldError>,
}

impl Checks {
    /// Record the outcome of one check, keeping the value when it passed.
    pub(crate) fn check<T, E: Display>(
        &mut self,
        field: impl Into<String>,
        result: Result<T, E>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.fail(field, e);
                None
            }
        }
    }

    pub(crate) fn fail(&mut self, field: impl Into<String>, message: impl Display) {
        self.fields.push(FieldError {
            field: field.into(),
            message: message.to_string(),
        });
    }

    pub(crate) fn name(&mut self, field: &str, value: &str) -> Option<ResourceName> {
        self.check(field, ResourceName::new(value))
    }

    pub(crate) fn labels(&mut self, field: &str, labels: &BTreeMap<String, String>) {
        for (key, value) in labels {
            if let Err(e) = check_label(key, value) {
                self.fail(format!("{field}.{key}"), e);
            }
        }
    }

    pub(crate) fn options(&mut self, field: &str, options: &BTreeMap<String, String>) {
        for (key, value) in options {
            if key.is_empty() || key.contains(['=', '\0']) || value.contains('\0') {
                self.fail(
                    format!("{field}.{key}"),
                    "option keys must be non-empty without '='; values cannot contain NUL",
                );
            }
        }
    }

    /// Finish validation. `build` only runs when every check passed.
    pub(crate) fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationError> {
        if !self.fields.is_empty() {
            return Err(ValidationError {
                fields: self.fields,
            });
        }
        build().ok_or_else(|| ValidationError {
            fields: vec![FieldError {
                field: "request".to_string(),
                message: "incomplete request".to_string(),
            }],
        })
    }
}

/// A list field that also accepts the dashboard's comma-separated string form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ListInput {
    Text(String),
    Items(Vec<String>),
}

impl ListInput {
    /// Entries with surrounding whitespace trimmed and blanks dropped.
    pub fn entries(&self) -> Vec<String> {
        match self {
            ListInput::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            ListInput::Items(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl Default for ListInput {
    fn default() -> Self {
        ListInput::Items(Vec::new())
    }
}

impl From<&str> for ListInput {
    fn from(value: &str) -> Self {
        ListInput::Text(value.to_string())
    }
}

impl From<Vec<String>> for ListInput {
    fn from(value: Vec<String>) -> Self {
        ListInput::Items(value)
    }
}
