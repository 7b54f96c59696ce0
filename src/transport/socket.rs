// ABOUTME: Structured-client transport over the runtime's control socket via bollard.
// ABOUTME: Supports Docker and Podman; Podman pulls go through the libpod API.

use super::failure::TransportFailure;
use super::request::{CreateSpec, LifecycleAction, RawResult, Request, StructuredPayload};
use super::types::{Endpoint, RuntimeType, TransportKind};
use super::Transport;
use crate::types::ResourceKind;
use crate::validate::{
    ContainerSpec, ImageSpec, ListFilter, NetworkSpec, RemoveTarget, VolumeSpec,
};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{
    ContainerCreateBody, HostConfig, Ipam, IpamConfig, NetworkCreateRequest, PortBinding,
    VolumeCreateRequest,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, ListContainersOptions, ListImagesOptions,
    ListNetworksOptions, ListVolumesOptions, RemoveContainerOptions, RemoveImageOptions,
    RemoveVolumeOptions, RestartContainerOptions, StartContainerOptions, StatsOptions,
    StopContainerOptions,
};
use futures::StreamExt;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::UnixStream;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_bollard_error(e: bollard::errors::Error, timeout: Duration) -> TransportFailure {
    use bollard::errors::Error;
    match e {
        Error::DockerResponseServerError {
            status_code,
            message,
        } => TransportFailure::Structured {
            status: Some(status_code),
            message,
        },
        Error::DockerStreamError { error } => TransportFailure::Structured {
            status: None,
            message: error,
        },
        Error::RequestTimeoutError => TransportFailure::TimedOut { after: timeout },
        other @ (Error::JsonDataError { .. } | Error::JsonSerdeError { .. }) => {
            TransportFailure::malformed(other.to_string())
        }
        other => TransportFailure::connection(other.to_string()),
    }
}

/// The engine answers 304 when a container is already in the requested state;
/// the CLI treats that as success, and so do we.
fn is_not_modified(e: &bollard::errors::Error) -> bool {
    matches!(
        e,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 304,
            ..
        }
    )
}

/// Whether a failed stats sample means the runtime itself is gone.
fn aborts_usage(failure: &TransportFailure) -> bool {
    matches!(
        failure,
        TransportFailure::Connection { .. } | TransportFailure::TimedOut { .. }
    )
}

fn is_gone(failure: &TransportFailure) -> bool {
    matches!(
        failure,
        TransportFailure::Structured {
            status: Some(404),
            ..
        }
    )
}

fn filter_map(kind: ResourceKind, filter: &ListFilter) -> HashMap<String, Vec<String>> {
    let mut filters: HashMap<String, Vec<String>> = HashMap::new();

    if let Some(ref id) = filter.id
        && matches!(kind, ResourceKind::Container | ResourceKind::Network)
    {
        filters.insert("id".to_string(), vec![id.clone()]);
    }

    if let Some(ref name) = filter.name
        && kind != ResourceKind::Image
    {
        filters.insert("name".to_string(), vec![name.clone()]);
    }

    if let Some(ref reference) = filter.reference
        && kind == ResourceKind::Image
    {
        filters.insert("reference".to_string(), vec![reference.clone()]);
    }

    for label in &filter.labels {
        filters
            .entry("label".to_string())
            .or_default()
            .push(label.clone());
    }

    filters
}

// =============================================================================
// SocketTransport
// =============================================================================

/// Transport that talks to the runtime's API over a Unix socket.
///
/// Dropping an in-flight `invoke` future drops the underlying HTTP request,
/// which closes its connection.
pub struct SocketTransport {
    client: Docker,
    runtime_type: RuntimeType,
    socket_path: String,
    timeout: Duration,
    tls_verify: bool,
}

impl SocketTransport {
    /// Connect to the runtime at `endpoint`.
    ///
    /// `timeout` bounds each HTTP request; callers impose their own, usually
    /// shorter, deadlines on top.
    pub fn connect(
        endpoint: &Endpoint,
        timeout: Duration,
        tls_verify: bool,
    ) -> Result<Self, TransportFailure> {
        let client = Docker::connect_with_unix(
            &endpoint.socket_path,
            timeout.as_secs().max(1),
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| TransportFailure::connection(e.to_string()))?;

        Ok(Self {
            client,
            runtime_type: endpoint.runtime_type,
            socket_path: endpoint.socket_path.clone(),
            timeout,
            tls_verify,
        })
    }

    /// Get the runtime type (Docker or Podman).
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    fn map_err(&self, e: bollard::errors::Error) -> TransportFailure {
        map_bollard_error(e, self.timeout)
    }

    async fn list(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
    ) -> Result<RawResult, TransportFailure> {
        let filters = Some(filter_map(kind, filter));
        let payload = match kind {
            ResourceKind::Container => {
                let opts = ListContainersOptions {
                    all: filter.all,
                    size: filter.size,
                    filters,
                    ..Default::default()
                };
                StructuredPayload::Containers(self.list_containers(opts).await?)
            }
            ResourceKind::Image => {
                let opts = ListImagesOptions {
                    all: filter.all,
                    filters,
                    ..Default::default()
                };
                let images = self
                    .client
                    .list_images(Some(opts))
                    .await
                    .map_err(|e| self.map_err(e))?;
                StructuredPayload::Images(images)
            }
            ResourceKind::Network => {
                let opts = ListNetworksOptions { filters };
                let networks = self
                    .client
                    .list_networks(Some(opts))
                    .await
                    .map_err(|e| self.map_err(e))?;
                StructuredPayload::Networks(networks)
            }
            ResourceKind::Volume => {
                let opts = ListVolumesOptions { filters };
                let response = self
                    .client
                    .list_volumes(Some(opts))
                    .await
                    .map_err(|e| self.map_err(e))?;
                StructuredPayload::Volumes(response.volumes.unwrap_or_default())
            }
        };
        Ok(RawResult::Structured(payload))
    }

    async fn list_containers(
        &self,
        opts: ListContainersOptions,
    ) -> Result<Vec<bollard::models::ContainerSummary>, TransportFailure> {
        // Podman reports "stopping" as a container state during shutdown, but bollard
        // doesn't recognize it and fails deserialization. Retry after a short delay
        // since "stopping" is a transient state.
        let mut attempt = 0;
        loop {
            match self.client.list_containers(Some(opts.clone())).await {
                Ok(containers) => return Ok(containers),
                Err(e) => {
                    let err_str = e.to_string();
                    let transient = err_str.contains("unknown variant `stopping`")
                        || err_str.contains("unknown variant `stopped`");
                    if transient && attempt < 2 {
                        attempt += 1;
                        tracing::debug!(attempt, "retrying container list after transient state");
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        continue;
                    }
                    return Err(self.map_err(e));
                }
            }
        }
    }

    async fn create(&self, spec: &CreateSpec) -> Result<RawResult, TransportFailure> {
        match spec {
            CreateSpec::Container(spec) => self.create_container(spec).await,
            CreateSpec::Image(spec) => self.pull_image(spec).await,
            CreateSpec::Network(spec) => self.create_network(spec).await,
            CreateSpec::Volume(spec) => self.create_volume(spec).await,
        }
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<RawResult, TransportFailure> {
        let env: Vec<String> = spec.env.iter().map(|e| e.to_string()).collect();

        let labels: HashMap<String, String> = spec
            .labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        let mut exposed_ports: Vec<String> = Vec::new();
        for port in &spec.ports {
            let port_key = port.container_key();
            if !exposed_ports.contains(&port_key) {
                exposed_ports.push(port_key.clone());
            }
            port_bindings
                .entry(port_key)
                .or_insert_with(|| Some(Vec::new()))
                .get_or_insert_with(Vec::new)
                .push(PortBinding {
                    host_ip: None,
                    host_port: Some(port.host_port.to_string()),
                });
        }

        let host_config = HostConfig {
            port_bindings: if port_bindings.is_empty() {
                None
            } else {
                Some(port_bindings)
            },
            ..Default::default()
        };

        let container_config = ContainerCreateBody {
            image: Some(spec.image.to_string()),
            env: if env.is_empty() { None } else { Some(env) },
            labels: if labels.is_empty() {
                None
            } else {
                Some(labels)
            },
            cmd: if spec.command.is_empty() {
                None
            } else {
                Some(spec.command.clone())
            },
            exposed_ports: if exposed_ports.is_empty() {
                None
            } else {
                Some(exposed_ports)
            },
            host_config: Some(host_config),
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: Some(spec.name.to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), container_config)
            .await
            .map_err(|e| self.map_err(e))?;

        Ok(RawResult::Created(response.id))
    }

    async fn pull_image(&self, spec: &ImageSpec) -> Result<RawResult, TransportFailure> {
        let image_name = spec.reference.to_string();

        // Podman's libpod endpoint lets us pass tlsVerify through.
        if self.runtime_type == RuntimeType::Podman {
            self.pull_image_libpod(&image_name).await?;
            return Ok(RawResult::Done);
        }

        let opts = CreateImageOptions {
            from_image: Some(image_name),
            ..Default::default()
        };

        // Pull returns a stream of progress updates - consume it
        let mut stream = self.client.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| self.map_err(e))?;
        }

        Ok(RawResult::Done)
    }

    /// Pull image using Podman's native libpod API.
    async fn pull_image_libpod(&self, image_name: &str) -> Result<(), TransportFailure> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            TransportFailure::connection(format!("failed to connect to socket: {}", e))
        })?;

        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| TransportFailure::connection(format!("HTTP handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("libpod connection error: {}", e);
            }
        });

        let uri = format!(
            "/v4.0.0/libpod/images/pull?reference={}&tlsVerify={}",
            urlencoding::encode(image_name),
            self.tls_verify
        );

        let req = hyper::Request::builder()
            .method("POST")
            .uri(&uri)
            .header("Host", "localhost")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| TransportFailure::connection(format!("failed to build request: {}", e)))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| TransportFailure::connection(format!("request failed: {}", e)))?;

        use http_body_util::BodyExt;

        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| TransportFailure::connection(format!("failed to read response: {}", e)))?
            .to_bytes();
        let body_text = String::from_utf8_lossy(&body);

        if !status.is_success() {
            return Err(TransportFailure::Structured {
                status: Some(status.as_u16()),
                message: libpod_message(&body_text),
            });
        }

        // Progress lines; a failed pull still answers 200 with an error line.
        if let Some(error) = body_text
            .lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .find_map(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .filter(|e| !e.is_empty())
        {
            return Err(TransportFailure::Structured {
                status: None,
                message: error,
            });
        }

        Ok(())
    }

    async fn create_network(&self, spec: &NetworkSpec) -> Result<RawResult, TransportFailure> {
        let ipam = spec.ipam.as_ref().map(|ipam| Ipam {
            config: Some(vec![IpamConfig {
                subnet: Some(ipam.subnet.to_string()),
                gateway: ipam.gateway.map(|g| g.to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        });

        let request = NetworkCreateRequest {
            name: spec.name.to_string(),
            driver: spec.driver.as_ref().map(|d| d.to_string()),
            internal: Some(spec.internal),
            attachable: Some(spec.attachable),
            enable_ipv6: Some(spec.enable_ipv6),
            ipam,
            options: to_hash_map(&spec.options),
            labels: to_hash_map(&spec.labels),
            ..Default::default()
        };

        let response = self
            .client
            .create_network(request)
            .await
            .map_err(|e| self.map_err(e))?;

        Ok(RawResult::Created(response.id))
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<RawResult, TransportFailure> {
        let options = VolumeCreateRequest {
            name: Some(spec.name.to_string()),
            driver: spec.driver.as_ref().map(|d| d.to_string()),
            driver_opts: to_hash_map(&spec.options),
            labels: to_hash_map(&spec.labels),
            ..Default::default()
        };

        let volume = self
            .client
            .create_volume(options)
            .await
            .map_err(|e| self.map_err(e))?;

        Ok(RawResult::Created(volume.name))
    }

    async fn remove(
        &self,
        kind: ResourceKind,
        target: &RemoveTarget,
        force: bool,
    ) -> Result<RawResult, TransportFailure> {
        let target = target.to_string();
        let result = match kind {
            ResourceKind::Container => {
                let opts = RemoveContainerOptions {
                    force,
                    ..Default::default()
                };
                self.client.remove_container(&target, Some(opts)).await
            }
            ResourceKind::Image => {
                let opts = RemoveImageOptions {
                    force,
                    ..Default::default()
                };
                self.client
                    .remove_image(&target, Some(opts), None)
                    .await
                    .map(|_| ())
            }
            // The engine has no forced network removal.
            ResourceKind::Network => self.client.remove_network(&target).await,
            ResourceKind::Volume => {
                let opts = RemoveVolumeOptions { force };
                self.client.remove_volume(&target, Some(opts)).await
            }
        };

        result.map_err(|e| self.map_err(e))?;
        Ok(RawResult::Done)
    }

    async fn lifecycle(
        &self,
        action: LifecycleAction,
        target: &str,
        grace: Option<Duration>,
    ) -> Result<RawResult, TransportFailure> {
        let grace = grace.map(|d| d.as_secs().min(i32::MAX as u64) as i32);
        let result = match action {
            LifecycleAction::Start => {
                self.client
                    .start_container(target, None::<StartContainerOptions>)
                    .await
            }
            LifecycleAction::Stop => {
                let opts = StopContainerOptions {
                    t: grace,
                    signal: None,
                };
                self.client.stop_container(target, Some(opts)).await
            }
            LifecycleAction::Restart => {
                let opts = RestartContainerOptions {
                    t: grace,
                    ..Default::default()
                };
                self.client.restart_container(target, Some(opts)).await
            }
        };

        match result {
            Ok(()) => Ok(RawResult::Done),
            Err(e) if is_not_modified(&e) => Ok(RawResult::Done),
            Err(e) => Err(self.map_err(e)),
        }
    }

    /// Sample every running container once, all at the same time. A
    /// container that exits between the list and its sample is skipped; losing
    /// the runtime mid-sample fails the whole call.
    async fn usage(&self) -> Result<RawResult, TransportFailure> {
        let running = self
            .list_containers(ListContainersOptions::default())
            .await?;

        let client = &self.client;
        let sampled = futures::future::join_all(running.into_iter().filter_map(|c| c.id).map(
            move |id| async move {
                let opts = StatsOptions {
                    stream: false,
                    one_shot: false,
                };
                let sample = {
                    let mut stream = client.stats(&id, Some(opts));
                    stream.next().await
                };
                (id, sample)
            },
        ))
        .await;

        let mut samples = Vec::with_capacity(sampled.len());
        for (id, sample) in sampled {
            match sample {
                Some(Ok(stats)) => samples.push(stats),
                Some(Err(e)) => {
                    let failure = self.map_err(e);
                    if aborts_usage(&failure) {
                        return Err(failure);
                    }
                    if is_gone(&failure) {
                        tracing::debug!(container = %id, "container exited before its sample");
                    } else {
                        tracing::warn!(container = %id, error = %failure, "stats sample failed");
                    }
                }
                None => {}
            }
        }

        Ok(RawResult::Structured(StructuredPayload::Stats(samples)))
    }
}

fn to_hash_map(
    map: &std::collections::BTreeMap<String, String>,
) -> Option<HashMap<String, String>> {
    if map.is_empty() {
        None
    } else {
        Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

/// Pull the `message` (or `cause`) out of a libpod error body.
fn libpod_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("cause"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl Transport for SocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    async fn invoke(&self, request: &Request) -> Result<RawResult, TransportFailure> {
        tracing::debug!(
            transport = %self.kind(),
            runtime = %self.runtime_type,
            action = %request.action(),
            kind = ?request.kind(),
            "invoking runtime"
        );

        match request {
            Request::List { kind, filter } => self.list(*kind, filter).await,
            Request::Create(spec) => self.create(spec).await,
            Request::Remove {
                kind,
                target,
                force,
            } => self.remove(*kind, target, *force).await,
            Request::Lifecycle {
                action,
                target,
                grace,
            } => self.lifecycle(*action, target.as_str(), *grace).await,
            Request::Ping => {
                self.client.ping().await.map_err(|e| self.map_err(e))?;
                Ok(RawResult::Done)
            }
            Request::Info => {
                let info = self.client.info().await.map_err(|e| self.map_err(e))?;
                Ok(RawResult::Structured(StructuredPayload::Info(Box::new(info))))
            }
            Request::Usage => self.usage().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_keep_their_status() {
        let failure = map_bollard_error(
            bollard::errors::Error::DockerResponseServerError {
                status_code: 409,
                message: "Conflict. The container name \"/web\" is already in use".to_string(),
            },
            Duration::from_secs(5),
        );
        assert!(matches!(
            failure,
            TransportFailure::Structured {
                status: Some(409),
                ..
            }
        ));
    }

    #[test]
    fn request_timeout_maps_to_timed_out() {
        let failure = map_bollard_error(
            bollard::errors::Error::RequestTimeoutError,
            Duration::from_secs(5),
        );
        assert_eq!(
            failure,
            TransportFailure::TimedOut {
                after: Duration::from_secs(5)
            }
        );
    }

    #[test]
    fn lost_runtime_fails_usage_but_missing_container_does_not() {
        let lost = map_bollard_error(
            bollard::errors::Error::IOError {
                err: std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"),
            },
            Duration::from_secs(5),
        );
        assert!(aborts_usage(&lost), "{lost:?}");
        assert!(aborts_usage(&TransportFailure::TimedOut {
            after: Duration::from_secs(5)
        }));

        let gone = map_bollard_error(
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message: "No such container: web".to_string(),
            },
            Duration::from_secs(5),
        );
        assert!(!aborts_usage(&gone));
        assert!(is_gone(&gone));
    }

    #[test]
    fn filters_only_carry_what_the_kind_supports() {
        let filter = ListFilter::default()
            .with_id("abc")
            .with_name("web")
            .with_reference("nginx:latest")
            .with_label("tier=front");

        let images = filter_map(ResourceKind::Image, &filter);
        assert!(!images.contains_key("id"));
        assert!(!images.contains_key("name"));
        assert_eq!(images["reference"], vec!["nginx:latest".to_string()]);

        let volumes = filter_map(ResourceKind::Volume, &filter);
        assert!(!volumes.contains_key("id"));
        assert_eq!(volumes["name"], vec!["web".to_string()]);
        assert_eq!(volumes["label"], vec!["tier=front".to_string()]);
    }

    #[test]
    fn libpod_message_prefers_message_field() {
        assert_eq!(
            libpod_message(r#"{"cause":"x","message":"image not known","response":404}"#),
            "image not known"
        );
        assert_eq!(libpod_message("plain text\n"), "plain text");
    }
}
