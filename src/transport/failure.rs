// ABOUTME: The tagged union every transport reports failures with.
// ABOUTME: Raw signals only; the classifier decides what they mean.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    /// The runtime could not be reached: socket missing, spawn failed,
    /// connection refused or reset.
    #[error("cannot reach container runtime: {message}")]
    Connection { message: String },

    /// The runtime answered over its API with an error.
    #[error("runtime error (status {status:?}): {message}")]
    Structured { status: Option<u16>, message: String },

    /// The command-line tool exited unsuccessfully.
    #[error("runtime command failed (exit code {exit_code:?}): {stderr}")]
    Process {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The runtime answered, but not in a form we could read.
    #[error("unreadable runtime output: {message}")]
    Malformed { message: String },

    /// No answer within the caller's deadline. The operation may still
    /// complete on the runtime side.
    #[error("runtime call timed out after {after:?}")]
    TimedOut { after: Duration },
}

impl TransportFailure {
    pub fn connection(message: impl Into<String>) -> Self {
        TransportFailure::Connection {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        TransportFailure::Malformed {
            message: message.into(),
        }
    }

    /// The runtime's own words, when there are any.
    pub fn raw_message(&self) -> Option<&str> {
        match self {
            TransportFailure::Connection { message }
            | TransportFailure::Structured { message, .. }
            | TransportFailure::Malformed { message } => Some(message),
            TransportFailure::Process { stderr, .. } => Some(stderr),
            TransportFailure::TimedOut { .. } => None,
        }
    }
}
