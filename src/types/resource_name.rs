// ABOUTME: Validated names and ID strings for containers, networks, and volumes.
// ABOUTME: First character alphanumeric, then [A-Za-z0-9_.-], at most 255 characters.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub const MAX_NAME_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceNameError {
    #[error("name cannot be empty")]
    Empty,

    #[error("name exceeds maximum length of {MAX_NAME_LENGTH} characters")]
    TooLong,

    #[error("name must start with a letter or digit")]
    InvalidStart,

    #[error("invalid character in name: {0:?}")]
    InvalidChar(char),
}

/// A container, network, or volume name, or an ID in the same alphabet.
///
/// The runtime accepts either form wherever a resource is addressed, so one
/// type covers both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(value: &str) -> Result<Self, ResourceNameError> {
        if value.is_empty() {
            return Err(ResourceNameError::Empty);
        }

        if value.len() > MAX_NAME_LENGTH {
            return Err(ResourceNameError::TooLong);
        }

        let mut chars = value.chars();
        if !chars.next().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return Err(ResourceNameError::InvalidStart);
        }

        for c in chars {
            if !c.is_ascii_alphanumeric() && c != '_' && c != '.' && c != '-' {
                return Err(ResourceNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
