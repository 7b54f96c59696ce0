// ABOUTME: In-process runtime emulation answering in either transport's native shape.
// ABOUTME: Reproduces the engine's uniqueness and in-use rules and its error texts.

use super::Transport;
use super::failure::TransportFailure;
use super::request::{CreateSpec, LifecycleAction, RawResult, Request, StructuredPayload};
use super::types::TransportKind;
use crate::types::{ImageRef, ResourceKind};
use crate::validate::{
    ContainerSpec, ImageSpec, ImageTarget, ListFilter, NetworkSpec, RemoveTarget, VolumeSpec,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Duration;

const BASE_EPOCH: i64 = 1_700_000_000;
const DAEMON_DOWN: &str = "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?";

/// Which transport's output the emulation imitates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Typed API objects and status-coded errors, like the socket transport.
    Structured,
    /// JSON lines and stderr with exit codes, like the command-line transport.
    Lines,
}

#[derive(Debug, Clone, Copy, Default)]
enum Outage {
    #[default]
    None,
    Calls(usize),
    Always,
}

#[derive(Debug, Clone)]
struct MemContainer {
    id: String,
    name: String,
    image: String,
    image_id: String,
    state: &'static str,
    ports: Vec<crate::types::PortMapping>,
    labels: BTreeMap<String, String>,
    command: String,
    created: i64,
}

#[derive(Debug, Clone)]
struct MemImage {
    id: String,
    repo_tags: Vec<String>,
    size: u64,
    created: i64,
    parent: Option<String>,
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct MemNetwork {
    id: String,
    name: String,
    driver: String,
    internal: bool,
    enable_ipv6: bool,
    attachable: bool,
    subnet: String,
    gateway: Option<String>,
    labels: BTreeMap<String, String>,
    options: BTreeMap<String, String>,
    created: i64,
}

#[derive(Debug, Clone)]
struct MemVolume {
    name: String,
    driver: String,
    labels: BTreeMap<String, String>,
    options: BTreeMap<String, String>,
    created: i64,
}

#[derive(Debug)]
struct State {
    shape: Shape,
    seq: u64,
    containers: Vec<MemContainer>,
    images: Vec<MemImage>,
    networks: Vec<MemNetwork>,
    volumes: Vec<MemVolume>,
    /// Pullable references (normalized `repository:tag`) and their sizes.
    registry: BTreeMap<String, u64>,
    outage: Outage,
    malformed: Vec<(ResourceKind, String)>,
    calls: Vec<Request>,
}

/// A runtime that lives in memory.
///
/// Each call is applied atomically, so concurrent requests race the way they
/// do against a real engine: one wins, the others see its effect.
pub struct MemoryTransport {
    delay: Option<Duration>,
    state: Mutex<State>,
}

impl MemoryTransport {
    /// Emulate the command-line tool.
    pub fn new() -> Self {
        Self::with_shape(Shape::Lines)
    }

    /// Emulate the structured API client.
    pub fn structured() -> Self {
        Self::with_shape(Shape::Structured)
    }

    pub fn with_shape(shape: Shape) -> Self {
        Self {
            delay: None,
            state: Mutex::new(State {
                shape,
                seq: 0,
                containers: Vec::new(),
                images: Vec::new(),
                networks: Vec::new(),
                volumes: Vec::new(),
                registry: BTreeMap::new(),
                outage: Outage::None,
                malformed: Vec::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// A local image that is also available from the registry.
    pub fn with_image(mut self, reference: &str, size: u64) -> Self {
        let state = self.state.get_mut();
        let tag = canonical_tag(reference);
        state.registry.insert(tag.clone(), size);
        state.add_image(tag, size);
        self
    }

    /// An image that can be pulled but is not present locally.
    pub fn with_registry_image(mut self, reference: &str, size: u64) -> Self {
        self.state
            .get_mut()
            .registry
            .insert(canonical_tag(reference), size);
        self
    }

    /// Every call fails as if the daemon were down.
    pub fn unreachable(mut self) -> Self {
        self.state.get_mut().outage = Outage::Always;
        self
    }

    /// The first `calls` calls fail as if the daemon were down.
    pub fn unreachable_for(mut self, calls: usize) -> Self {
        self.state.get_mut().outage = Outage::Calls(calls);
        self
    }

    /// Answer every call only after `delay`. State changes happen before the
    /// wait, so an abandoned call may still have taken effect.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Append an unparsable line to line-shaped list output for `kind`.
    pub fn with_malformed_line(mut self, kind: ResourceKind, line: &str) -> Self {
        self.state
            .get_mut()
            .malformed
            .push((kind, line.to_string()));
        self
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<Request> {
        self.state.lock().calls.clone()
    }

    pub fn shape(&self) -> Shape {
        self.state.lock().shape
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Memory
    }

    async fn invoke(&self, request: &Request) -> Result<RawResult, TransportFailure> {
        let result = {
            let mut state = self.state.lock();
            state.calls.push(request.clone());
            if state.take_outage() {
                Err(state.unreachable())
            } else {
                state.apply(request)
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

// =============================================================================
// Emulation
// =============================================================================

impl State {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn take_outage(&mut self) -> bool {
        match self.outage {
            Outage::None => false,
            Outage::Always => true,
            Outage::Calls(0) => {
                self.outage = Outage::None;
                false
            }
            Outage::Calls(n) => {
                self.outage = Outage::Calls(n - 1);
                true
            }
        }
    }

    fn unreachable(&self) -> TransportFailure {
        match self.shape {
            Shape::Structured => TransportFailure::connection(format!(
                "error trying to connect: {DAEMON_DOWN}"
            )),
            Shape::Lines => TransportFailure::Process {
                exit_code: Some(1),
                stderr: format!("{DAEMON_DOWN}\n"),
            },
        }
    }

    fn fault(&self, status: u16, message: impl Into<String>) -> TransportFailure {
        let message = message.into();
        match self.shape {
            Shape::Structured => TransportFailure::Structured {
                status: Some(status),
                message,
            },
            Shape::Lines => TransportFailure::Process {
                exit_code: Some(1),
                stderr: format!("Error response from daemon: {message}\n"),
            },
        }
    }

    fn add_image(&mut self, tag: String, size: u64) -> String {
        let seq = self.next_seq();
        let id = format!("sha256:{}", hex_id(seq, 0x1ea9e));
        self.images.push(MemImage {
            id: id.clone(),
            repo_tags: vec![tag],
            size,
            created: BASE_EPOCH + seq as i64,
            parent: None,
            labels: BTreeMap::new(),
        });
        id
    }

    fn apply(&mut self, request: &Request) -> Result<RawResult, TransportFailure> {
        match request {
            Request::List { kind, filter } => self.list(*kind, filter),
            Request::Create(CreateSpec::Container(spec)) => self.create_container(spec),
            Request::Create(CreateSpec::Image(spec)) => self.pull(spec),
            Request::Create(CreateSpec::Network(spec)) => self.create_network(spec),
            Request::Create(CreateSpec::Volume(spec)) => self.create_volume(spec),
            Request::Remove {
                kind,
                target,
                force,
            } => self.remove(*kind, target, *force),
            Request::Lifecycle { action, target, .. } => self.lifecycle(*action, target.as_str()),
            Request::Ping => Ok(RawResult::Done),
            Request::Info => self.info(),
            Request::Usage => self.usage(),
        }
    }

    // --- lookups -------------------------------------------------------------

    fn find_container(&self, key: &str) -> Option<usize> {
        self.containers
            .iter()
            .position(|c| c.name == key)
            .or_else(|| self.containers.iter().position(|c| c.id.starts_with(key)))
    }

    fn find_network(&self, key: &str) -> Option<usize> {
        self.networks
            .iter()
            .position(|n| n.name == key)
            .or_else(|| self.networks.iter().position(|n| n.id.starts_with(key)))
    }

    fn find_image_by_tag(&self, tag: &str) -> Option<usize> {
        self.images
            .iter()
            .position(|i| i.repo_tags.iter().any(|t| t == tag))
    }

    fn find_image_by_id(&self, id: &str) -> Option<usize> {
        let bare = id.strip_prefix("sha256:").unwrap_or(id);
        self.images
            .iter()
            .position(|i| i.id.trim_start_matches("sha256:").starts_with(bare))
    }

    // --- create --------------------------------------------------------------

    fn create_container(&mut self, spec: &ContainerSpec) -> Result<RawResult, TransportFailure> {
        let image = spec.image.to_string();
        let Some(image_idx) = self.find_image_by_tag(&canonical_tag(&image)) else {
            return Err(self.fault(404, format!("No such image: {image}")));
        };

        if let Some(existing) = self.containers.iter().find(|c| c.name == spec.name.as_str()) {
            let message = format!(
                "Conflict. The container name \"/{}\" is already in use by container \"{}\". \
                 You have to remove (or rename) that container to be able to reuse that name.",
                spec.name, existing.id
            );
            return Err(self.fault(409, message));
        }

        let seq = self.next_seq();
        let id = hex_id(seq, 0xc0a7);
        let image_id = self.images[image_idx].id.clone();
        self.containers.push(MemContainer {
            id: id.clone(),
            name: spec.name.to_string(),
            image,
            image_id,
            state: "created",
            ports: spec.ports.clone(),
            labels: spec.labels.clone(),
            command: spec.command.join(" "),
            created: BASE_EPOCH + seq as i64,
        });
        Ok(RawResult::Created(id))
    }

    fn pull(&mut self, spec: &ImageSpec) -> Result<RawResult, TransportFailure> {
        let tag = canonical_tag(&spec.reference.to_string());
        let Some(&size) = self.registry.get(&tag) else {
            let message = format!(
                "pull access denied for {}, repository does not exist or may require \
                 'docker login': denied: requested access to the resource is denied",
                spec.reference.repository()
            );
            return Err(self.fault(404, message));
        };
        if self.find_image_by_tag(&tag).is_none() {
            self.add_image(tag, size);
        }
        Ok(RawResult::Done)
    }

    fn create_network(&mut self, spec: &NetworkSpec) -> Result<RawResult, TransportFailure> {
        if self.networks.iter().any(|n| n.name == spec.name.as_str()) {
            return Err(self.fault(
                409,
                format!("network with name {} already exists", spec.name),
            ));
        }

        let seq = self.next_seq();
        let (subnet, gateway) = match &spec.ipam {
            Some(ipam) => (ipam.subnet.to_string(), ipam.gateway.map(|g| g.to_string())),
            None => {
                let octet = 18 + self.networks.len();
                (
                    format!("172.{octet}.0.0/16"),
                    Some(format!("172.{octet}.0.1")),
                )
            }
        };

        if let Some(existing) = self.networks.iter().find(|n| n.subnet == subnet) {
            let message = format!(
                "invalid pool request: Pool overlaps with other one on this address space ({})",
                existing.name
            );
            return Err(self.fault(400, message));
        }

        let id = hex_id(seq, 0x7e7);
        self.networks.push(MemNetwork {
            id: id.clone(),
            name: spec.name.to_string(),
            driver: spec
                .driver
                .as_ref()
                .map_or_else(|| "bridge".to_string(), |d| d.to_string()),
            internal: spec.internal,
            enable_ipv6: spec.enable_ipv6,
            attachable: spec.attachable,
            subnet,
            gateway,
            labels: spec.labels.clone(),
            options: spec.options.clone(),
            created: BASE_EPOCH + seq as i64,
        });
        Ok(RawResult::Created(id))
    }

    fn create_volume(&mut self, spec: &VolumeSpec) -> Result<RawResult, TransportFailure> {
        // The engine answers an existing name with the existing volume.
        if !self.volumes.iter().any(|v| v.name == spec.name.as_str()) {
            let seq = self.next_seq();
            self.volumes.push(MemVolume {
                name: spec.name.to_string(),
                driver: spec
                    .driver
                    .as_ref()
                    .map_or_else(|| "local".to_string(), |d| d.to_string()),
                labels: spec.labels.clone(),
                options: spec.options.clone(),
                created: BASE_EPOCH + seq as i64,
            });
        }
        Ok(RawResult::Created(spec.name.to_string()))
    }

    // --- remove --------------------------------------------------------------

    fn remove(
        &mut self,
        kind: ResourceKind,
        target: &RemoveTarget,
        force: bool,
    ) -> Result<RawResult, TransportFailure> {
        match (kind, target) {
            (ResourceKind::Image, RemoveTarget::Image(target)) => self.remove_image(target, force),
            (ResourceKind::Container, RemoveTarget::Named(name)) => {
                let Some(idx) = self.find_container(name.as_str()) else {
                    return Err(self.fault(404, format!("No such container: {name}")));
                };
                if self.containers[idx].state == "running" && !force {
                    let message = format!(
                        "cannot remove container \"/{}\": container is running: stop the \
                         container before removing or force remove",
                        self.containers[idx].name
                    );
                    return Err(self.fault(409, message));
                }
                self.containers.remove(idx);
                Ok(RawResult::Done)
            }
            (ResourceKind::Network, RemoveTarget::Named(name)) => {
                let Some(idx) = self.find_network(name.as_str()) else {
                    return Err(self.fault(404, format!("network {name} not found")));
                };
                self.networks.remove(idx);
                Ok(RawResult::Done)
            }
            (ResourceKind::Volume, RemoveTarget::Named(name)) => {
                let Some(idx) = self.volumes.iter().position(|v| v.name == name.as_str()) else {
                    return Err(self.fault(404, format!("get {name}: no such volume")));
                };
                self.volumes.remove(idx);
                Ok(RawResult::Done)
            }
            (kind, target) => Err(self.fault(
                400,
                format!("invalid reference format: {target} is not a {kind} reference"),
            )),
        }
    }

    fn remove_image(&mut self, target: &ImageTarget, force: bool) -> Result<RawResult, TransportFailure> {
        let (idx, tag) = match target {
            ImageTarget::Reference(reference) => {
                let tag = canonical_tag(&reference.to_string());
                match self.find_image_by_tag(&tag) {
                    Some(idx) => (idx, Some(tag)),
                    None => return Err(self.fault(404, format!("No such image: {reference}"))),
                }
            }
            ImageTarget::Id(id) => match self.find_image_by_id(id.as_str()) {
                Some(idx) => (idx, None),
                None => return Err(self.fault(404, format!("No such image: {id}"))),
            },
        };

        let image = &self.images[idx];
        let short_id = short(&image.id).to_string();

        if tag.is_none() && image.repo_tags.len() > 1 && !force {
            let message = format!(
                "conflict: unable to delete {short_id} (must be forced) - image is referenced \
                 in multiple repositories"
            );
            return Err(self.fault(409, message));
        }

        // Dropping one of several tags leaves the image in place.
        if let Some(tag) = tag
            && image.repo_tags.len() > 1
        {
            self.images[idx].repo_tags.retain(|t| *t != tag);
            return Ok(RawResult::Done);
        }

        if !force
            && let Some(user) = self.containers.iter().find(|c| c.image_id == image.id)
        {
            let message = format!(
                "conflict: unable to remove repository reference \"{target}\" (must force) - \
                 container {} is using its referenced image {short_id}",
                short(&user.id)
            );
            return Err(self.fault(409, message));
        }

        self.images.remove(idx);
        Ok(RawResult::Done)
    }

    // --- lifecycle -----------------------------------------------------------

    fn lifecycle(&mut self, action: LifecycleAction, target: &str) -> Result<RawResult, TransportFailure> {
        let Some(idx) = self.find_container(target) else {
            return Err(self.fault(404, format!("No such container: {target}")));
        };
        self.containers[idx].state = match action {
            LifecycleAction::Start | LifecycleAction::Restart => "running",
            LifecycleAction::Stop => {
                if self.containers[idx].state == "created" {
                    "created"
                } else {
                    "exited"
                }
            }
        };
        Ok(RawResult::Done)
    }

    // --- list ----------------------------------------------------------------

    fn list(&self, kind: ResourceKind, filter: &ListFilter) -> Result<RawResult, TransportFailure> {
        let values: Vec<Value> = match kind {
            ResourceKind::Container => self
                .containers
                .iter()
                .filter(|c| filter.all || c.state == "running")
                .filter(|c| filter.id.as_ref().is_none_or(|id| c.id.starts_with(id.as_str())))
                .filter(|c| filter.name.as_ref().is_none_or(|n| c.name.contains(n.as_str())))
                .filter(|c| labels_match(&c.labels, filter))
                .map(|c| self.container_json(c, filter.size))
                .collect(),
            ResourceKind::Image => self
                .images
                .iter()
                .filter(|i| labels_match(&i.labels, filter))
                .filter(|i| {
                    filter.reference.as_ref().is_none_or(|r| {
                        let wanted = canonical_tag(r);
                        i.repo_tags.iter().any(|t| *t == wanted)
                    })
                })
                .map(|i| self.image_json(i))
                .collect(),
            ResourceKind::Network => self
                .networks
                .iter()
                .filter(|n| filter.id.as_ref().is_none_or(|id| n.id.starts_with(id.as_str())))
                .filter(|n| filter.name.as_ref().is_none_or(|f| n.name.contains(f.as_str())))
                .filter(|n| labels_match(&n.labels, filter))
                .map(network_json)
                .collect(),
            ResourceKind::Volume => self
                .volumes
                .iter()
                .filter(|v| filter.name.as_ref().is_none_or(|f| v.name.contains(f.as_str())))
                .filter(|v| labels_match(&v.labels, filter))
                .map(|v| self.volume_json(v))
                .collect(),
        };

        match self.shape {
            Shape::Structured => {
                let array = Value::Array(values);
                let payload = match kind {
                    ResourceKind::Container => StructuredPayload::Containers(decode(array)?),
                    ResourceKind::Image => StructuredPayload::Images(decode(array)?),
                    ResourceKind::Network => StructuredPayload::Networks(decode(array)?),
                    ResourceKind::Volume => StructuredPayload::Volumes(decode(array)?),
                };
                Ok(RawResult::Structured(payload))
            }
            Shape::Lines => {
                let mut lines: Vec<String> = values.iter().map(Value::to_string).collect();
                lines.extend(
                    self.malformed
                        .iter()
                        .filter(|(k, _)| *k == kind)
                        .map(|(_, line)| line.clone()),
                );
                Ok(RawResult::Lines(join_lines(lines)))
            }
        }
    }

    fn image_size(&self, image_id: &str) -> u64 {
        self.images
            .iter()
            .find(|i| i.id == image_id)
            .map_or(0, |i| i.size)
    }

    fn container_json(&self, c: &MemContainer, size: bool) -> Value {
        let running = c.state == "running";
        let status = match c.state {
            "running" => "Up Less than a second".to_string(),
            "exited" => "Exited (0) Less than a second ago".to_string(),
            _ => "Created".to_string(),
        };
        let virtual_size = self.image_size(&c.image_id);

        match self.shape {
            Shape::Structured => {
                let ports: Vec<Value> = if running {
                    c.ports
                        .iter()
                        .map(|p| {
                            json!({
                                "IP": "0.0.0.0",
                                "PrivatePort": p.container_port,
                                "PublicPort": p.host_port,
                                "Type": p.protocol.as_str(),
                            })
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                let mut value = json!({
                    "Id": c.id,
                    "Names": [format!("/{}", c.name)],
                    "Image": c.image,
                    "ImageID": c.image_id,
                    "Command": c.command,
                    "Created": c.created,
                    "Ports": ports,
                    "Labels": c.labels,
                    "State": c.state,
                    "Status": status,
                    "HostConfig": { "NetworkMode": "bridge" },
                    "NetworkSettings": { "Networks": { "bridge": {} } },
                    "Mounts": [],
                });
                if size {
                    value["SizeRw"] = json!(0);
                    value["SizeRootFs"] = json!(virtual_size);
                }
                value
            }
            Shape::Lines => {
                let ports = if running {
                    c.ports
                        .iter()
                        .map(|p| format!("0.0.0.0:{}->{}/{}", p.host_port, p.container_port, p.protocol))
                        .collect::<Vec<_>>()
                        .join(", ")
                } else {
                    String::new()
                };
                let labels = c
                    .labels
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(",");
                let mut value = json!({
                    "Command": format!("\"{}\"", c.command),
                    "CreatedAt": cli_time(c.created),
                    "ID": c.id,
                    "Image": c.image,
                    "Labels": labels,
                    "LocalVolumes": "0",
                    "Mounts": "",
                    "Names": c.name,
                    "Networks": "bridge",
                    "Ports": ports,
                    "RunningFor": "Less than a second ago",
                    "State": c.state,
                    "Status": status,
                });
                if size {
                    value["Size"] = json!(format!("0B (virtual {})", human_size(virtual_size)));
                }
                value
            }
        }
    }

    fn image_json(&self, i: &MemImage) -> Value {
        match self.shape {
            Shape::Structured => json!({
                "Id": i.id,
                "ParentId": i.parent.clone().unwrap_or_default(),
                "RepoTags": i.repo_tags,
                "RepoDigests": [],
                "Created": i.created,
                "Size": i.size,
                "SharedSize": -1,
                "Labels": i.labels,
                "Containers": -1,
            }),
            Shape::Lines => json!({
                "Id": i.id,
                "RepoTags": i.repo_tags,
                "RepoDigests": [],
                "Parent": i.parent.clone().unwrap_or_default(),
                "Comment": "",
                "Created": rfc3339(i.created),
                "Config": { "Labels": if i.labels.is_empty() { Value::Null } else { json!(i.labels) } },
                "Architecture": "amd64",
                "Os": "linux",
                "Size": i.size,
            }),
        }
    }

    fn volume_json(&self, v: &MemVolume) -> Value {
        let labels = match self.shape {
            Shape::Lines if v.labels.is_empty() => Value::Null,
            _ => json!(v.labels),
        };
        json!({
            "CreatedAt": rfc3339(v.created),
            "Driver": v.driver,
            "Labels": labels,
            "Mountpoint": format!("/var/lib/docker/volumes/{}/_data", v.name),
            "Name": v.name,
            "Options": v.options,
            "Scope": "local",
        })
    }

    // --- engine --------------------------------------------------------------

    fn info(&self) -> Result<RawResult, TransportFailure> {
        let running = self.containers.iter().filter(|c| c.state == "running").count();
        let value = json!({
            "ID": "MEMO:RY00:0000:0000:0000:0000:0000:0000",
            "Name": "memory",
            "Containers": self.containers.len(),
            "ContainersRunning": running,
            "ContainersPaused": 0,
            "ContainersStopped": self.containers.len() - running,
            "Images": self.images.len(),
            "ServerVersion": "27.0.0-memory",
            "KernelVersion": "6.0.0",
            "OperatingSystem": "In-memory engine",
            "Architecture": "x86_64",
            "NCPU": 4,
            "MemTotal": 8_000_000_000u64,
        });
        match self.shape {
            Shape::Structured => Ok(RawResult::Structured(StructuredPayload::Info(Box::new(
                decode(value)?,
            )))),
            Shape::Lines => Ok(RawResult::Lines(format!("{value}\n"))),
        }
    }

    /// Running container `n` (from 1) uses 10·n % CPU and 5·n % memory.
    fn usage(&self) -> Result<RawResult, TransportFailure> {
        let running = self.containers.iter().filter(|c| c.state == "running");
        let values: Vec<Value> = running
            .enumerate()
            .map(|(i, c)| {
                let n = i as u64 + 1;
                match self.shape {
                    Shape::Structured => json!({
                        "id": c.id,
                        "name": format!("/{}", c.name),
                        "cpu_stats": {
                            "cpu_usage": { "total_usage": 1_000_000 + 25_000_000 * n },
                            "system_cpu_usage": 2_000_000_000u64,
                            "online_cpus": 4,
                        },
                        "precpu_stats": {
                            "cpu_usage": { "total_usage": 1_000_000 },
                            "system_cpu_usage": 1_000_000_000u64,
                            "online_cpus": 4,
                        },
                        "memory_stats": { "usage": 50_000_000 * n, "limit": 1_000_000_000u64 },
                    }),
                    Shape::Lines => json!({
                        "BlockIO": "0B / 0B",
                        "CPUPerc": format!("{:.2}%", 10.0 * n as f64),
                        "Container": c.id,
                        "ID": c.id,
                        "MemPerc": format!("{:.2}%", 5.0 * n as f64),
                        "MemUsage": format!("{} / 1GB", human_size(50_000_000 * n)),
                        "Name": c.name,
                        "NetIO": "0B / 0B",
                        "PIDs": "1",
                    }),
                }
            })
            .collect();

        match self.shape {
            Shape::Structured => Ok(RawResult::Structured(StructuredPayload::Stats(decode(
                Value::Array(values),
            )?))),
            Shape::Lines => Ok(RawResult::Lines(join_lines(
                values.iter().map(Value::to_string).collect(),
            ))),
        }
    }
}

fn network_json(n: &MemNetwork) -> Value {
    let mut config = json!({ "Subnet": n.subnet });
    if let Some(ref gateway) = n.gateway {
        config["Gateway"] = json!(gateway);
    }
    json!({
        "Name": n.name,
        "Id": n.id,
        "Created": rfc3339(n.created),
        "Scope": "local",
        "Driver": n.driver,
        "EnableIPv6": n.enable_ipv6,
        "IPAM": { "Driver": "default", "Options": {}, "Config": [config] },
        "Internal": n.internal,
        "Attachable": n.attachable,
        "Ingress": false,
        "ConfigOnly": false,
        "Containers": {},
        "Options": n.options,
        "Labels": n.labels,
    })
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, TransportFailure> {
    serde_json::from_value(value).map_err(|e| TransportFailure::malformed(e.to_string()))
}

fn labels_match(labels: &BTreeMap<String, String>, filter: &ListFilter) -> bool {
    filter.label_pairs().all(|(key, value)| match value {
        Some(value) => labels.get(key).is_some_and(|v| v == value),
        None => labels.contains_key(key),
    })
}

fn join_lines(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// `repository:tag` as the engine lists it.
fn canonical_tag(reference: &str) -> String {
    match ImageRef::parse(reference) {
        Ok(parsed) => format!(
            "{}:{}",
            parsed.repository(),
            parsed.tag().unwrap_or("latest")
        ),
        Err(_) => reference.to_string(),
    }
}

fn short(id: &str) -> &str {
    let bare = id.strip_prefix("sha256:").unwrap_or(id);
    &bare[..bare.len().min(12)]
}

fn timestamp(epoch: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch, 0).unwrap_or_default()
}

fn rfc3339(epoch: i64) -> String {
    timestamp(epoch).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// The command-line tool's table timestamp, e.g. `2023-11-14 22:13:21 +0000 UTC`.
fn cli_time(epoch: i64) -> String {
    timestamp(epoch).format("%Y-%m-%d %H:%M:%S %z UTC").to_string()
}

/// Decimal units with four significant digits, as the command-line tool prints sizes.
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    let digits = if value >= 100.0 {
        1
    } else if value >= 10.0 {
        2
    } else {
        3
    };
    let text = format!("{value:.digits$}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text}{}", UNITS[unit])
}

/// Deterministic 64-hex-digit identifier.
fn hex_id(seq: u64, salt: u64) -> String {
    let mut state = seq.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ salt;
    (0..4)
        .map(|_| {
            state = splitmix64(state);
            format!("{state:016x}")
        })
        .collect()
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
