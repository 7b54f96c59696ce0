// ABOUTME: HTTP API tests driving the router directly with tower's oneshot.
// ABOUTME: Status codes, response bodies, and the skipped-records header.

mod support;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use dockyard::api::{self, SKIPPED_HEADER};
use dockyard::transport::{MemoryTransport, Shape};
use dockyard::types::ResourceKind;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use support::{gateway, runtime};
use tower::ServiceExt;

fn app(transport: MemoryTransport) -> Router {
    let (gateway, _) = gateway(transport);
    api::router(gateway)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn web() -> Value {
    json!({ "containerName": "web", "imageName": "nginx:latest", "ports": "8080:80" })
}

#[tokio::test]
async fn health_answers_ok() {
    let app = app(runtime(Shape::Structured));

    let (status, body) = send(&app, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn health_reports_unavailable_runtime() {
    let app = app(runtime(Shape::Lines).unreachable());

    let (status, body) = send(&app, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "transport_unavailable");
    assert_eq!(body["error"], "container runtime is unavailable");
}

#[tokio::test]
async fn create_container_answers_created_then_conflict() {
    let app = app(runtime(Shape::Lines));

    let (status, body) = send(&app, Method::POST, "/api/containers", Some(web())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["record"]["state"], "running");
    assert_eq!(body["record"]["ports"][0]["hostPort"], 8080);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("container web created and started (ID: "));

    let (status, body) = send(&app, Method::POST, "/api/containers", Some(web())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
    assert!(body["detail"].as_str().unwrap().contains("already in use"));
    assert!(body.get("outcomeUnknown").is_none());
}

#[tokio::test]
async fn validation_failures_list_every_field() {
    let app = app(runtime(Shape::Structured));
    let request = json!({ "containerName": "-web", "imageName": "nginx latest", "ports": "abc:80" });

    let (status, body) = send(&app, Method::POST, "/api/containers", Some(request)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["name", "image", "ports[0]"]);
}

#[tokio::test]
async fn unparsable_body_is_a_validation_error() {
    let app = app(runtime(Shape::Structured));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/volumes",
        Some(json!({ "driver": "local" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn removing_missing_resources_is_not_found() {
    let app = app(runtime(Shape::Structured));

    for uri in [
        "/api/containers/ghost",
        "/api/images/ghost:1",
        "/api/networks/ghost",
        "/api/volumes/ghost",
    ] {
        let (status, body) = send(&app, Method::DELETE, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["kind"], "not_found");
    }
}

#[tokio::test]
async fn image_reference_with_slashes_can_be_removed() {
    let app = app(runtime(Shape::Lines).with_registry_image("ghcr.io/org/app:v1", 1_000));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/images",
        Some(json!({ "image": "ghcr.io/org/app:v1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::DELETE, "/api/images/ghcr.io/org/app:v1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "image ghcr.io/org/app:v1 removed or untagged");
}

#[tokio::test]
async fn running_container_removal_needs_force() {
    let app = app(runtime(Shape::Structured));
    send(&app, Method::POST, "/api/containers", Some(web())).await;

    let (status, _) = send(&app, Method::DELETE, "/api/containers/web", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::DELETE, "/api/containers/web?force=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "container web removed");
}

#[tokio::test]
async fn lifecycle_routes_change_state() {
    let app = app(runtime(Shape::Lines));
    send(&app, Method::POST, "/api/containers", Some(web())).await;

    let (status, _) = send(&app, Method::POST, "/api/containers/web/stop", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, running) = send(&app, Method::GET, "/api/containers", None).await;
    assert_eq!(running, json!([]));

    let (_, all) = send(&app, Method::GET, "/api/containers?all=true", None).await;
    assert_eq!(all[0]["state"], "exited");
}

#[tokio::test]
async fn list_reports_skipped_records_in_a_header() {
    let transport =
        runtime(Shape::Lines).with_malformed_line(ResourceKind::Network, "not json at all");
    let app = app(transport);

    let request = Request::builder()
        .uri("/api/networks")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[SKIPPED_HEADER], "1");
}

#[tokio::test]
async fn bad_filter_is_rejected() {
    let app = app(runtime(Shape::Structured));

    let (status, body) = send(&app, Method::GET, "/api/containers?id=not-hex", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn volume_and_network_creation() {
    let app = app(runtime(Shape::Structured));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/volumes",
        Some(json!({ "name": "data" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "data");
    assert_eq!(body["message"], "volume data created");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/networks",
        Some(json!({ "name": "backend" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["record"]["name"], "backend");

    let (_, volumes) = send(&app, Method::GET, "/api/volumes", None).await;
    assert_eq!(volumes.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn docker_stats_summarizes_the_engine() {
    let app = app(runtime(Shape::Structured));
    send(&app, Method::POST, "/api/containers", Some(web())).await;

    let (status, body) = send(&app, Method::GET, "/api/docker-stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["containers"]["running"], 1);
    assert_eq!(body["images"], 1);
    assert_eq!(body["cpuPercent"], 10.0);
}
