// ABOUTME: Test support utilities.
// ABOUTME: Tracing setup and gateways over the in-memory runtime in both result shapes.

use dockyard::config::RetryPolicy;
use dockyard::gateway::Gateway;
use dockyard::transport::{MemoryTransport, Shape};
use std::sync::{Arc, Once};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("dockyard=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Both raw shapes a runtime answers in: structured objects and CLI lines.
#[allow(dead_code)]
pub const SHAPES: [Shape; 2] = [Shape::Structured, Shape::Lines];

/// An in-memory runtime with nginx and redis pullable, nginx already local.
#[allow(dead_code)]
pub fn runtime(shape: Shape) -> MemoryTransport {
    MemoryTransport::with_shape(shape)
        .with_image("nginx:latest", 187_000_000)
        .with_registry_image("redis:7", 117_000_000)
}

/// A gateway over `transport` that never retries.
#[allow(dead_code)]
pub fn gateway(transport: MemoryTransport) -> (Gateway, Arc<MemoryTransport>) {
    init_tracing();
    let transport = Arc::new(transport);
    let gateway = Gateway::new(transport.clone()).with_retry(RetryPolicy::none());
    (gateway, transport)
}
