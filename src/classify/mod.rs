// ABOUTME: Maps every transport failure to one stable error kind and a caller-facing message.
// ABOUTME: Status codes first, then the shared phrase table; identical for both transports.

mod patterns;

use crate::transport::{CreateSpec, Request, TransportFailure};
use serde::Serialize;
use std::fmt;

/// Stable classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected locally before reaching the runtime.
    Validation,
    NotFound,
    /// Name collision, resource in use, or running container.
    Conflict,
    /// Passed validation but refused by the runtime.
    InvalidRequest,
    /// Registry authentication required or denied.
    Unauthorized,
    /// Daemon unreachable, socket missing, or no answer in time.
    TransportUnavailable,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::TransportUnavailable => "transport_unavailable",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// HTTP-style status for the presentation layer.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::InvalidRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Unauthorized => 401,
            ErrorKind::TransportUnavailable | ErrorKind::Unknown => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: ErrorKind,
    /// Caller-facing message phrased from the request, never raw runtime text.
    pub message: String,
    /// The runtime's own words, for diagnostics.
    pub detail: Option<String>,
    /// The runtime may have applied the change even though the call failed.
    pub outcome_unknown: bool,
}

/// Classify `failure` in the context of the request that produced it.
pub fn classify(failure: &TransportFailure, request: &Request) -> Classified {
    let kind = match failure {
        TransportFailure::Connection { .. } | TransportFailure::TimedOut { .. } => {
            ErrorKind::TransportUnavailable
        }
        TransportFailure::Malformed { .. } => ErrorKind::Unknown,
        TransportFailure::Structured {
            status: Some(status),
            message,
        } => by_status(*status, message),
        TransportFailure::Structured {
            status: None,
            message,
        } => by_text(message),
        TransportFailure::Process { stderr, .. } => by_text(stderr),
    };

    let outcome_unknown =
        matches!(failure, TransportFailure::TimedOut { .. }) && !request.is_read_only();

    let mut message = describe(kind, request);
    if let TransportFailure::TimedOut { after } = failure {
        message = format!("container runtime did not answer within {after:?}");
    }
    if outcome_unknown {
        message.push_str("; the change may still have been applied, list to confirm");
    }

    Classified {
        kind,
        message,
        detail: failure.raw_message().map(clean_detail).filter(|d| !d.is_empty()),
        outcome_unknown,
    }
}

fn by_status(status: u16, message: &str) -> ErrorKind {
    match status {
        401 => ErrorKind::Unauthorized,
        // Docker answers a denied pull with 404.
        404 => patterns::match_kinds(message, &[ErrorKind::Unauthorized])
            .unwrap_or(ErrorKind::NotFound),
        409 => ErrorKind::Conflict,
        400 => ErrorKind::InvalidRequest,
        _ => by_text(message),
    }
}

fn by_text(text: &str) -> ErrorKind {
    patterns::match_text(text).unwrap_or(ErrorKind::Unknown)
}

/// Strip the CLI's framing so both transports report the same detail.
fn clean_detail(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("Error response from daemon: ")
        .or_else(|| trimmed.strip_prefix("Error: "))
        .unwrap_or(trimmed)
        .to_string()
}

fn describe(kind: ErrorKind, request: &Request) -> String {
    let noun = request.kind().map(|k| k.as_str()).unwrap_or("runtime");
    let subject = request
        .subject()
        .map(|s| format!("{noun} {s}"))
        .unwrap_or_else(|| noun.to_string());
    let action = request.action();

    match kind {
        ErrorKind::NotFound => match request {
            Request::Create(CreateSpec::Container(spec)) => {
                format!("image {} not found", spec.image)
            }
            Request::Create(CreateSpec::Image(spec)) => {
                format!("image {} not found", spec.reference)
            }
            _ => format!("{subject} not found"),
        },
        ErrorKind::Conflict => match action {
            crate::transport::Action::Create => format!("{subject} already exists"),
            crate::transport::Action::Remove => {
                format!("{subject} is in use; stop or detach it, or remove with force")
            }
            _ => format!("{subject} conflicts with its current state"),
        },
        ErrorKind::Unauthorized => format!("registry refused access for {subject}"),
        ErrorKind::InvalidRequest => format!("runtime rejected the {action} request for {subject}"),
        ErrorKind::TransportUnavailable => "container runtime is unavailable".to_string(),
        ErrorKind::Validation => format!("invalid {action} request for {subject}"),
        ErrorKind::Unknown => format!("unexpected runtime error during {action} of {subject}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceKind;
    use crate::validate::{ContainerRequest, RemoveRequest};
    use std::time::Duration;

    fn create_web() -> Request {
        let spec = ContainerRequest::new("web", "nginx:latest").validate().unwrap();
        Request::Create(CreateSpec::Container(spec))
    }

    fn remove_web() -> Request {
        let target = RemoveRequest::new("web")
            .validate(ResourceKind::Container)
            .unwrap();
        Request::Remove {
            kind: ResourceKind::Container,
            target,
            force: false,
        }
    }

    #[test]
    fn status_and_stderr_agree_on_conflict() {
        let text = "cannot remove container \"/web\": container is running: stop the container before removing or force remove";
        let structured = TransportFailure::Structured {
            status: Some(409),
            message: text.to_string(),
        };
        let process = TransportFailure::Process {
            exit_code: Some(1),
            stderr: format!("Error response from daemon: {text}\n"),
        };

        let a = classify(&structured, &remove_web());
        let b = classify(&process, &remove_web());

        assert_eq!(a, b);
        assert_eq!(a.kind, ErrorKind::Conflict);
        assert_eq!(a.detail.as_deref(), Some(text));
    }

    #[test]
    fn missing_image_on_create_names_the_image() {
        let failure = TransportFailure::Structured {
            status: Some(404),
            message: "No such image: nginx:latest".to_string(),
        };

        let classified = classify(&failure, &create_web());

        assert_eq!(classified.kind, ErrorKind::NotFound);
        assert_eq!(classified.message, "image nginx:latest not found");
    }

    #[test]
    fn timed_out_create_is_outcome_unknown() {
        let failure = TransportFailure::TimedOut {
            after: Duration::from_secs(30),
        };

        let classified = classify(&failure, &create_web());

        assert_eq!(classified.kind, ErrorKind::TransportUnavailable);
        assert!(classified.outcome_unknown);
        assert!(classified.message.contains("list to confirm"));
    }

    #[test]
    fn timed_out_list_is_not_outcome_unknown() {
        let failure = TransportFailure::TimedOut {
            after: Duration::from_secs(30),
        };

        let classified = classify(&failure, &Request::Ping);

        assert!(!classified.outcome_unknown);
    }

    #[test]
    fn unmatched_stderr_is_unknown_with_detail() {
        let failure = TransportFailure::Process {
            exit_code: Some(125),
            stderr: "Error: the moon is in the wrong phase\n".to_string(),
        };

        let classified = classify(&failure, &remove_web());

        assert_eq!(classified.kind, ErrorKind::Unknown);
        assert_eq!(classified.detail.as_deref(), Some("the moon is in the wrong phase"));
    }

    #[test]
    fn malformed_output_is_unknown() {
        let classified = classify(&TransportFailure::malformed("expected value"), &Request::Ping);
        assert_eq!(classified.kind, ErrorKind::Unknown);
    }

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(ErrorKind::Validation.status_code(), 400);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::Conflict.status_code(), 409);
        assert_eq!(ErrorKind::Unauthorized.status_code(), 401);
        assert_eq!(ErrorKind::TransportUnavailable.status_code(), 500);
    }
}
