// ABOUTME: Container environment entries in KEY=VALUE form.
// ABOUTME: KEY matches [A-Za-z_][A-Za-z0-9_]*; the value is everything after the first '='.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvEntryError {
    #[error("expected KEY=VALUE, got {0:?}")]
    MissingSeparator(String),

    #[error("variable name cannot be empty")]
    EmptyKey,

    #[error("variable name must start with a letter or underscore: {0:?}")]
    InvalidStart(String),

    #[error("invalid character {1:?} in variable name {0:?}")]
    InvalidChar(String, char),

    #[error("value of {0} contains a NUL byte")]
    NulInValue(String),
}

/// A validated environment variable assignment.
///
/// Keys cannot contain `=`, so splitting at the first `=` is unambiguous and
/// values are free to contain further `=` characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvEntry {
    key: String,
    value: String,
}

impl EnvEntry {
    pub fn parse(input: &str) -> Result<Self, EnvEntryError> {
        let (key, value) = input
            .split_once('=')
            .ok_or_else(|| EnvEntryError::MissingSeparator(input.to_string()))?;

        let mut chars = key.chars();
        match chars.next() {
            None => return Err(EnvEntryError::EmptyKey),
            Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
                return Err(EnvEntryError::InvalidStart(key.to_string()));
            }
            Some(_) => {}
        }
        if let Some(c) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
            return Err(EnvEntryError::InvalidChar(key.to_string(), c));
        }

        if value.contains('\0') {
            return Err(EnvEntryError::NulInValue(key.to_string()));
        }

        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for EnvEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
