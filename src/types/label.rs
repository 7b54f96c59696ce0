// ABOUTME: Label keys and values attached to containers, networks, and volumes.
// ABOUTME: Keys are printable without '=' or whitespace; values only exclude NUL.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("label key cannot be empty")]
    EmptyKey,

    #[error("invalid character {1:?} in label key {0:?}")]
    InvalidKeyChar(String, char),

    #[error("value of label {0} contains a NUL byte")]
    NulInValue(String),
}

/// Check one label pair.
pub fn check_label(key: &str, value: &str) -> Result<(), LabelError> {
    if key.is_empty() {
        return Err(LabelError::EmptyKey);
    }
    if let Some(c) = key
        .chars()
        .find(|c| *c == '=' || c.is_whitespace() || c.is_control())
    {
        return Err(LabelError::InvalidKeyChar(key.to_string(), c));
    }
    if value.contains('\0') {
        return Err(LabelError::NulInValue(key.to_string()));
    }
    Ok(())
}
