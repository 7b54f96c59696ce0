// ABOUTME: HTTP API the dashboard consumes, one route per gateway operation.
// ABOUTME: Built on axum; shuts down gracefully on Ctrl-C.

mod error;
mod handlers;

pub use error::{ApiError, ErrorBody};
pub use handlers::SKIPPED_HEADER;

use crate::gateway::Gateway;
use axum::Router;
use axum::routing::{delete, get, post};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// The application router with `gateway` as shared state.
pub fn router(gateway: Gateway) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/docker-stats", get(handlers::engine_summary))
        .route(
            "/api/containers",
            get(handlers::list_containers).post(handlers::create_container),
        )
        .route("/api/containers/{id}", delete(handlers::remove_container))
        .route("/api/containers/{id}/start", post(handlers::start_container))
        .route("/api/containers/{id}/stop", post(handlers::stop_container))
        .route(
            "/api/containers/{id}/restart",
            post(handlers::restart_container),
        )
        .route(
            "/api/images",
            get(handlers::list_images).post(handlers::pull_image),
        )
        .route("/api/images/{*target}", delete(handlers::remove_image))
        .route(
            "/api/networks",
            get(handlers::list_networks).post(handlers::create_network),
        )
        .route("/api/networks/{id}", delete(handlers::remove_network))
        .route(
            "/api/volumes",
            get(handlers::list_volumes).post(handlers::create_volume),
        )
        .route("/api/volumes/{name}", delete(handlers::remove_volume))
        .with_state(gateway)
}

/// Serve the API on `listen` until Ctrl-C.
pub async fn serve(listen: SocketAddr, gateway: Gateway) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    tracing::info!(address = %listener.local_addr()?, "dockyard API listening");

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl-C; serving until killed");
            std::future::pending::<()>().await
        }
    }
}
