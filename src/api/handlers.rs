// ABOUTME: Route handlers: parse the HTTP request, call the gateway, shape the response.
// ABOUTME: Lists carry their skipped count in a header; creates answer 201 with the record.

use super::error::ApiError;
use crate::gateway::Gateway;
use crate::normalize::Listing;
use crate::validate::{
    ContainerRequest, ImageRequest, ListFilter, NetworkRequest, RemoveRequest, VolumeRequest,
};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::HeaderName;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const SKIPPED_HEADER: HeaderName = HeaderName::from_static("x-skipped-records");

type Body<T> = Result<Json<T>, JsonRejection>;
type Params<T> = Result<Query<T>, QueryRejection>;

/// Query parameters shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    all: bool,
    #[serde(default)]
    size: bool,
    id: Option<String>,
    name: Option<String>,
    reference: Option<String>,
    /// Comma-separated `key` or `key=value` entries.
    label: Option<String>,
}

impl From<ListQuery> for ListFilter {
    fn from(query: ListQuery) -> Self {
        ListFilter {
            all: query.all,
            size: query.size,
            id: query.id,
            name: query.name,
            reference: query.reference,
            labels: query
                .label
                .map(|l| {
                    l.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ForceQuery {
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Serialize)]
pub struct Created<T> {
    message: String,
    id: String,
    record: T,
}

fn listing<T: Serialize>(listing: Listing<T>) -> Response {
    (
        [(SKIPPED_HEADER, listing.skipped.to_string())],
        Json(listing.records),
    )
        .into_response()
}

fn created<T: Serialize>(message: String, id: String, record: T) -> Response {
    (StatusCode::CREATED, Json(Created { message, id, record })).into_response()
}

fn done(message: String) -> Response {
    Json(json!({ "message": message })).into_response()
}

pub async fn health(State(gateway): State<Gateway>) -> Result<Response, ApiError> {
    gateway.ping().await?;
    Ok(Json(json!({ "status": "ok" })).into_response())
}

pub async fn engine_summary(State(gateway): State<Gateway>) -> Result<Response, ApiError> {
    Ok(Json(gateway.engine_summary().await?).into_response())
}

// --- containers --------------------------------------------------------------

pub async fn list_containers(
    State(gateway): State<Gateway>,
    query: Params<ListQuery>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    Ok(listing(gateway.list_containers(&query.into()).await?))
}

pub async fn create_container(
    State(gateway): State<Gateway>,
    body: Body<ContainerRequest>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let record = gateway.create_container(&request).await?;
    let verb = if request.start {
        "created and started"
    } else {
        "created"
    };
    let message = format!(
        "container {} {verb} (ID: {})",
        request.name,
        record.id.short()
    );
    Ok(created(message, record.id.to_string(), record))
}

pub async fn remove_container(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
    query: Params<ForceQuery>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let request = RemoveRequest {
        target: id,
        force: query.force,
    };
    gateway.remove_container(&request).await?;
    Ok(done(format!("container {} removed", request.target)))
}

pub async fn start_container(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    gateway.start_container(&id).await?;
    Ok(done(format!("container {id} started")))
}

pub async fn stop_container(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    gateway.stop_container(&id).await?;
    Ok(done(format!("container {id} stopped")))
}

pub async fn restart_container(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    gateway.restart_container(&id).await?;
    Ok(done(format!("container {id} restarted")))
}

// --- images ------------------------------------------------------------------

pub async fn list_images(
    State(gateway): State<Gateway>,
    query: Params<ListQuery>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    Ok(listing(gateway.list_images(&query.into()).await?))
}

pub async fn pull_image(
    State(gateway): State<Gateway>,
    body: Body<ImageRequest>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let record = gateway.pull_image(&request).await?;
    let message = format!("image {} pulled", request.image);
    Ok(created(message, record.id.to_string(), record))
}

/// Image targets may contain `/`, so the route captures the rest of the path.
pub async fn remove_image(
    State(gateway): State<Gateway>,
    Path(target): Path<String>,
    query: Params<ForceQuery>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let request = RemoveRequest {
        target,
        force: query.force,
    };
    gateway.remove_image(&request).await?;
    Ok(done(format!("image {} removed or untagged", request.target)))
}

// --- networks ----------------------------------------------------------------

pub async fn list_networks(
    State(gateway): State<Gateway>,
    query: Params<ListQuery>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    Ok(listing(gateway.list_networks(&query.into()).await?))
}

pub async fn create_network(
    State(gateway): State<Gateway>,
    body: Body<NetworkRequest>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let record = gateway.create_network(&request).await?;
    let message = format!("network {} created", record.name);
    Ok(created(message, record.id.to_string(), record))
}

pub async fn remove_network(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    gateway.remove_network(&RemoveRequest::new(id.as_str())).await?;
    Ok(done(format!("network {id} removed")))
}

// --- volumes -----------------------------------------------------------------

pub async fn list_volumes(
    State(gateway): State<Gateway>,
    query: Params<ListQuery>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    Ok(listing(gateway.list_volumes(&query.into()).await?))
}

pub async fn create_volume(
    State(gateway): State<Gateway>,
    body: Body<VolumeRequest>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let record = gateway.create_volume(&request).await?;
    let message = format!("volume {} created", record.name);
    let id = record.name.clone();
    Ok(created(message, id, record))
}

pub async fn remove_volume(
    State(gateway): State<Gateway>,
    Path(name): Path<String>,
    query: Params<ForceQuery>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let request = RemoveRequest {
        target: name,
        force: query.force,
    };
    gateway.remove_volume(&request).await?;
    Ok(done(format!("volume {} removed", request.target)))
}
