// ABOUTME: Gateway error types with SNAFU pattern.
// ABOUTME: Every failure reduces to one ErrorKind callers can branch on.

use snafu::Snafu;

use crate::classify::{Classified, ErrorKind};
use crate::normalize::NormalizeError;
use crate::types::ResourceKind;
use crate::validate::{FieldError, ValidationError};

/// A failed gateway operation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GatewayError {
    /// Rejected before dispatch.
    #[snafu(display("{source}"))]
    Invalid { source: ValidationError },

    /// The runtime refused or could not be reached.
    #[snafu(display("{}", classified.message))]
    Runtime { classified: Classified },

    /// Found by the existence check for kinds whose create would otherwise
    /// succeed silently on an existing resource.
    #[snafu(display("{kind} {key} already exists"))]
    AlreadyExists { kind: ResourceKind, key: String },

    #[snafu(display("unreadable {operation} result: {source}"))]
    Unreadable {
        operation: &'static str,
        source: NormalizeError,
    },

    /// Created successfully, then absent from the follow-up listing.
    #[snafu(display("{kind} {key} was created but is not listed"))]
    Vanished { kind: ResourceKind, key: String },
}

impl GatewayError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Invalid { .. } => ErrorKind::Validation,
            GatewayError::Runtime { classified } => classified.kind,
            GatewayError::AlreadyExists { .. } => ErrorKind::Conflict,
            GatewayError::Unreadable { .. } | GatewayError::Vanished { .. } => ErrorKind::Unknown,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Diagnostic detail: the runtime's own message, or the key that went
    /// missing.
    pub fn detail(&self) -> Option<&str> {
        match self {
            GatewayError::Runtime { classified } => classified.detail.as_deref(),
            GatewayError::Vanished { key, .. } => Some(key),
            GatewayError::Invalid { .. }
            | GatewayError::AlreadyExists { .. }
            | GatewayError::Unreadable { .. } => None,
        }
    }

    /// The change may have been applied even though the call failed.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, GatewayError::Runtime { classified } if classified.outcome_unknown)
    }

    /// Every failing field, for validation errors.
    pub fn fields(&self) -> Option<&[FieldError]> {
        match self {
            GatewayError::Invalid { source } => Some(&source.fields),
            _ => None,
        }
    }
}

impl From<ValidationError> for GatewayError {
    fn from(source: ValidationError) -> Self {
        GatewayError::Invalid { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exists_is_a_conflict() {
        let err = GatewayError::AlreadyExists {
            kind: ResourceKind::Volume,
            key: "data".to_string(),
        };

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.to_string(), "volume data already exists");
    }

    #[test]
    fn vanished_record_is_unknown_with_key_detail() {
        let err = GatewayError::Vanished {
            kind: ResourceKind::Container,
            key: "abc123".to_string(),
        };

        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.detail(), Some("abc123"));
        assert!(!err.outcome_unknown());
    }

    #[test]
    fn validation_exposes_fields() {
        let err = GatewayError::from(ValidationError {
            fields: vec![FieldError {
                field: "name".to_string(),
                message: "cannot be empty".to_string(),
            }],
        });

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.fields().map(|f| f.len()), Some(1));
    }
}
