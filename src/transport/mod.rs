// ABOUTME: Carries validated requests to a container runtime and returns raw results.
// ABOUTME: Socket, command-line, and in-memory backends share one trait.

mod cli;
mod detection;
mod failure;
mod memory;
mod request;
mod socket;
mod types;

pub use cli::CliTransport;
pub use detection::{DetectionError, detect_local, resolve};
pub use failure::TransportFailure;
pub use memory::{MemoryTransport, Shape};
pub use request::{Action, CreateSpec, LifecycleAction, RawResult, Request, StructuredPayload};
pub use socket::SocketTransport;
pub use types::{Endpoint, RuntimeType, TransportKind};

use crate::config::{Timeouts, TransportConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// A backend that can carry any [`Request`] to a runtime.
///
/// Implementations report runtime errors as [`TransportFailure`] without
/// interpreting them. Every call stops its runtime-side work when the future
/// is dropped.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn invoke(&self, request: &Request) -> Result<RawResult, TransportFailure>;
}

/// Error while setting up a transport.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error("failed to open runtime socket: {0}")]
    Socket(#[source] TransportFailure),
}

/// Build the transport named by `config`.
///
/// No request is sent; an unreachable runtime surfaces on the first call.
pub fn connect(
    config: &TransportConfig,
    timeouts: &Timeouts,
) -> Result<Arc<dyn Transport>, ConnectError> {
    match config.kind {
        TransportKind::Socket => {
            let endpoint = resolve(config.runtime, config.socket.as_deref())?;
            tracing::info!(
                runtime = %endpoint.runtime_type,
                socket = %endpoint.socket_path,
                "using socket transport"
            );
            let transport =
                SocketTransport::connect(&endpoint, timeouts.client_ceiling(), config.tls_verify)
                    .map_err(ConnectError::Socket)?;
            Ok(Arc::new(transport))
        }
        TransportKind::Cli => {
            let runtime_type = config
                .runtime
                .or_else(|| detect_local().ok().map(|e| e.runtime_type))
                .unwrap_or(RuntimeType::Docker);
            let binary = config
                .binary
                .clone()
                .unwrap_or_else(|| runtime_type.binary().to_string());
            tracing::info!(runtime = %runtime_type, binary = %binary, "using command-line transport");
            Ok(Arc::new(
                CliTransport::new(binary, runtime_type).with_tls_verify(config.tls_verify),
            ))
        }
        TransportKind::Memory => {
            tracing::warn!("using in-memory transport; no runtime is contacted");
            Ok(Arc::new(MemoryTransport::structured()))
        }
    }
}
