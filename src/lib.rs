// ABOUTME: Library root for dockyard - a resource-lifecycle gateway for Docker and Podman.
// ABOUTME: The main binary is in main.rs; the HTTP API and the gateway live here.

pub mod api;
pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod gateway;
pub mod normalize;
pub mod output;
pub mod records;
pub mod transport;
pub mod types;
pub mod validate;
