// ABOUTME: The resource gateway: list, create, and remove for every resource kind.
// ABOUTME: Validates, dispatches through one transport, classifies failures, normalizes results.

mod error;

pub use crate::classify::ErrorKind;
pub use error::GatewayError;

use crate::classify::classify;
use crate::config::{RetryPolicy, Timeouts};
use crate::normalize::{self, Listing, NormalizeError};
use crate::records::{ContainerRecord, EngineSummary, ImageRecord, NetworkRecord, VolumeRecord};
use crate::transport::{
    CreateSpec, LifecycleAction, RawResult, Request, Transport, TransportFailure,
};
use crate::types::{ImageRef, ResourceKind, ResourceName};
use crate::validate::{
    Checks, ContainerRequest, ImageRequest, ListFilter, NetworkRequest, RemoveRequest,
    VolumeRequest,
};
use error::{InvalidSnafu, UnreadableSnafu};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Uniform operations over containers, images, networks, and volumes.
///
/// Holds no resource state; the runtime is the only source of truth.
/// Clones share the transport.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    timeouts: Timeouts,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("transport", &self.transport.kind())
            .field("retry", &self.retry)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    // --- list ----------------------------------------------------------------

    pub async fn list_containers(
        &self,
        filter: &ListFilter,
    ) -> Result<Listing<ContainerRecord>, GatewayError> {
        filter.validate().context(InvalidSnafu)?;
        let raw = self.list(ResourceKind::Container, filter).await?;
        let mut listing = normalize::containers(raw).context(UnreadableSnafu {
            operation: "container list",
        })?;
        listing.records.retain(|c| {
            filter.name.as_ref().is_none_or(|n| c.has_name(n))
                && filter.id.as_ref().is_none_or(|id| c.id.matches(id))
                && labels_match(&c.labels, filter)
        });
        Ok(listing)
    }

    pub async fn list_images(
        &self,
        filter: &ListFilter,
    ) -> Result<Listing<ImageRecord>, GatewayError> {
        filter.validate().context(InvalidSnafu)?;
        let reference = filter
            .reference
            .as_deref()
            .and_then(|r| ImageRef::parse(r).ok());

        let raw = self
            .list(ResourceKind::Image, &image_filter(filter, reference.as_ref()))
            .await?;
        let mut listing = normalize::images(raw).context(UnreadableSnafu {
            operation: "image list",
        })?;
        listing.records.retain(|i| {
            reference.as_ref().is_none_or(|r| image_matches(i, r))
                && filter.id.as_ref().is_none_or(|id| i.id.matches(id))
                && labels_match(&i.labels, filter)
        });
        Ok(listing)
    }

    pub async fn list_networks(
        &self,
        filter: &ListFilter,
    ) -> Result<Listing<NetworkRecord>, GatewayError> {
        filter.validate().context(InvalidSnafu)?;
        let raw = self.list(ResourceKind::Network, filter).await?;
        let mut listing = normalize::networks(raw).context(UnreadableSnafu {
            operation: "network list",
        })?;
        listing.records.retain(|n| {
            filter.name.as_ref().is_none_or(|name| n.name == *name)
                && filter.id.as_ref().is_none_or(|id| n.id.matches(id))
                && labels_match(&n.labels, filter)
        });
        Ok(listing)
    }

    pub async fn list_volumes(
        &self,
        filter: &ListFilter,
    ) -> Result<Listing<VolumeRecord>, GatewayError> {
        filter.validate().context(InvalidSnafu)?;
        let raw = self.list(ResourceKind::Volume, filter).await?;
        let mut listing = normalize::volumes(raw).context(UnreadableSnafu {
            operation: "volume list",
        })?;
        listing.records.retain(|v| {
            filter.name.as_ref().is_none_or(|name| v.name == *name)
                && labels_match(&v.labels, filter)
        });
        Ok(listing)
    }

    async fn list(&self, kind: ResourceKind, filter: &ListFilter) -> Result<RawResult, GatewayError> {
        self.call(Request::List {
            kind,
            filter: filter.clone(),
        })
        .await
    }

    // --- create --------------------------------------------------------------

    /// Create a container and, unless the request says otherwise, start it.
    ///
    /// A name already in use is a conflict reported by the runtime; nothing
    /// is checked beforehand.
    pub async fn create_container(
        &self,
        request: &ContainerRequest,
    ) -> Result<ContainerRecord, GatewayError> {
        let spec = request.validate()?;
        let start = spec.start;
        let name = spec.name.clone();

        let raw = self.call(Request::Create(CreateSpec::Container(spec))).await?;
        let id = created_key(raw)?;
        tracing::info!(container = %name, id = %id, "container created");

        if start
            && let Err(e) = self.lifecycle(LifecycleAction::Start, name.clone()).await
        {
            tracing::warn!(container = %name, error = %e, "container created but failed to start");
            return Err(e);
        }

        let listing = self
            .list_containers(&ListFilter::all().with_id(id.as_str()))
            .await?;
        listing
            .records
            .into_iter()
            .find(|c| c.id.matches(&id))
            .ok_or(GatewayError::Vanished {
                kind: ResourceKind::Container,
                key: id,
            })
    }

    /// Pull an image. Without `refresh`, an image already present locally is
    /// a conflict and nothing is pulled.
    pub async fn pull_image(&self, request: &ImageRequest) -> Result<ImageRecord, GatewayError> {
        let spec = request.validate()?;
        let reference = spec.reference.clone();

        // Not atomic: two concurrent pulls can both pass. The runtime never
        // reports a duplicate pull, so this is the only place one is caught.
        if !spec.refresh && self.find_image(&reference).await?.is_some() {
            return Err(GatewayError::AlreadyExists {
                kind: ResourceKind::Image,
                key: reference.to_string(),
            });
        }

        self.call(Request::Create(CreateSpec::Image(spec))).await?;
        tracing::info!(image = %reference, "image pulled");

        self.find_image(&reference)
            .await?
            .ok_or(GatewayError::Vanished {
                kind: ResourceKind::Image,
                key: reference.to_string(),
            })
    }

    async fn find_image(&self, reference: &ImageRef) -> Result<Option<ImageRecord>, GatewayError> {
        let filter = ListFilter::default().with_reference(reference.to_string());
        let listing = self.list_images(&filter).await?;
        Ok(listing.records.into_iter().next())
    }

    pub async fn create_network(
        &self,
        request: &NetworkRequest,
    ) -> Result<NetworkRecord, GatewayError> {
        let spec = request.validate()?;
        let name = spec.name.to_string();

        let raw = self.call(Request::Create(CreateSpec::Network(spec))).await?;
        // Docker prints the new ID, Podman the name.
        let key = created_key(raw)?;
        tracing::info!(network = %name, key = %key, "network created");

        let listing = self
            .list_networks(&ListFilter::default().with_name(name.as_str()))
            .await?;
        listing
            .records
            .into_iter()
            .find(|n| n.id.matches(&key) || n.name == key)
            .ok_or(GatewayError::Vanished {
                kind: ResourceKind::Network,
                key,
            })
    }

    /// Create a volume. The runtime answers an existing name with the
    /// existing volume, so the name is checked first.
    pub async fn create_volume(
        &self,
        request: &VolumeRequest,
    ) -> Result<VolumeRecord, GatewayError> {
        let spec = request.validate()?;
        let name = spec.name.to_string();
        let by_name = ListFilter::default().with_name(name.as_str());

        // Not atomic: two concurrent creates can both pass. The runtime never
        // reports a duplicate name, so this is the only place one is caught.
        if !self.list_volumes(&by_name).await?.is_empty() {
            return Err(GatewayError::AlreadyExists {
                kind: ResourceKind::Volume,
                key: name,
            });
        }

        self.call(Request::Create(CreateSpec::Volume(spec))).await?;
        tracing::info!(volume = %name, "volume created");

        self.list_volumes(&by_name)
            .await?
            .records
            .into_iter()
            .next()
            .ok_or(GatewayError::Vanished {
                kind: ResourceKind::Volume,
                key: name,
            })
    }

    // --- remove --------------------------------------------------------------

    /// Remove a container. A running one is a conflict unless `force` is set.
    pub async fn remove_container(&self, request: &RemoveRequest) -> Result<(), GatewayError> {
        self.remove(ResourceKind::Container, request).await
    }

    pub async fn remove_image(&self, request: &RemoveRequest) -> Result<(), GatewayError> {
        self.remove(ResourceKind::Image, request).await
    }

    /// Networks have no forced removal; `force` is ignored.
    pub async fn remove_network(&self, request: &RemoveRequest) -> Result<(), GatewayError> {
        self.remove(ResourceKind::Network, request).await
    }

    pub async fn remove_volume(&self, request: &RemoveRequest) -> Result<(), GatewayError> {
        self.remove(ResourceKind::Volume, request).await
    }

    async fn remove(&self, kind: ResourceKind, request: &RemoveRequest) -> Result<(), GatewayError> {
        let target = request.validate(kind)?;
        tracing::debug!(%kind, %target, force = request.force, "removing");
        self.call(Request::Remove {
            kind,
            target,
            force: request.force,
        })
        .await?;
        Ok(())
    }

    // --- lifecycle -----------------------------------------------------------

    pub async fn start_container(&self, target: &str) -> Result<(), GatewayError> {
        self.lifecycle(LifecycleAction::Start, container_target(target)?)
            .await
    }

    /// Stop a container, giving it the configured grace period.
    pub async fn stop_container(&self, target: &str) -> Result<(), GatewayError> {
        self.lifecycle(LifecycleAction::Stop, container_target(target)?)
            .await
    }

    pub async fn restart_container(&self, target: &str) -> Result<(), GatewayError> {
        self.lifecycle(LifecycleAction::Restart, container_target(target)?)
            .await
    }

    async fn lifecycle(
        &self,
        action: LifecycleAction,
        target: ResourceName,
    ) -> Result<(), GatewayError> {
        let grace = match action {
            LifecycleAction::Start => None,
            LifecycleAction::Stop | LifecycleAction::Restart => Some(self.timeouts.stop),
        };
        self.call(Request::Lifecycle {
            action,
            target,
            grace,
        })
        .await?;
        Ok(())
    }

    // --- engine --------------------------------------------------------------

    /// Check that the runtime answers.
    pub async fn ping(&self) -> Result<(), GatewayError> {
        self.call(Request::Ping).await?;
        Ok(())
    }

    /// Counts, host facts, and mean usage across running containers.
    pub async fn engine_summary(&self) -> Result<EngineSummary, GatewayError> {
        let everything = ListFilter::default();
        let (info, usage, networks, volumes) = tokio::try_join!(
            self.call(Request::Info),
            self.call(Request::Usage),
            self.list_networks(&everything),
            self.list_volumes(&everything),
        )?;
        normalize::summary(info, usage, networks.len(), volumes.len()).context(UnreadableSnafu {
            operation: "engine summary",
        })
    }

    // --- dispatch ------------------------------------------------------------

    fn deadline(&self, request: &Request) -> Duration {
        match request {
            Request::Create(CreateSpec::Image(_)) => self.timeouts.pull,
            // The runtime waits out the grace period before answering.
            Request::Lifecycle {
                grace: Some(grace), ..
            } => self.timeouts.call + *grace,
            _ => self.timeouts.call,
        }
    }

    /// Send one request, bounded by its deadline. Read-only requests are
    /// retried while the runtime is unavailable.
    async fn call(&self, request: Request) -> Result<RawResult, GatewayError> {
        let attempts = if request.is_read_only() {
            self.retry.attempts.max(1)
        } else {
            1
        };
        let deadline = self.deadline(&request);

        let mut attempt = 1;
        loop {
            tracing::debug!(
                transport = %self.transport.kind(),
                kind = ?request.kind(),
                action = %request.action(),
                attempt,
                "invoking runtime"
            );

            // Dropping the invoke future on timeout kills a child process or
            // closes the connection.
            let outcome = match tokio::time::timeout(deadline, self.transport.invoke(&request)).await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(TransportFailure::TimedOut { after: deadline }),
            };

            let failure = match outcome {
                Ok(raw) => return Ok(raw),
                Err(failure) => failure,
            };

            let classified = classify(&failure, &request);
            if classified.kind == ErrorKind::TransportUnavailable && attempt < attempts {
                let delay = self.retry.delay(attempt);
                tracing::warn!(
                    attempt,
                    of = attempts,
                    delay = ?delay,
                    error = %failure,
                    "runtime unavailable, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            tracing::debug!(
                kind = %classified.kind,
                action = %request.action(),
                error = %failure,
                "runtime call failed"
            );
            return Err(GatewayError::Runtime { classified });
        }
    }
}

fn created_key(raw: RawResult) -> Result<String, GatewayError> {
    match raw {
        RawResult::Created(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        other => Err(GatewayError::Unreadable {
            operation: "create",
            source: NormalizeError {
                expected: "created resource key",
                got: other.shape(),
            },
        }),
    }
}

fn container_target(target: &str) -> Result<ResourceName, GatewayError> {
    let mut checks = Checks::default();
    let name = checks.name("target", target);
    Ok(checks.finish(|| name)?)
}

/// The runtime's reference filter, spelled the way `repo_tags` reports it.
fn image_filter(filter: &ListFilter, reference: Option<&ImageRef>) -> ListFilter {
    let mut filter = filter.clone();
    if let Some(reference) = reference
        && let Some(tag) = reference.tag()
        && reference.digest().is_none()
    {
        filter.reference = Some(format!("{}:{}", reference.repository(), tag));
    }
    filter
}

/// Tagged references must name one of the image's tags; digest references
/// are trusted to the runtime's own filter.
fn image_matches(image: &ImageRecord, reference: &ImageRef) -> bool {
    reference.tag().is_none()
        || reference.digest().is_some()
        || image.repo_tags.iter().any(|t| reference.matches_repo_tag(t))
}

fn labels_match(labels: &BTreeMap<String, String>, filter: &ListFilter) -> bool {
    filter.label_pairs().all(|(key, value)| match value {
        Some(value) => labels.get(key).is_some_and(|v| v == value),
        None => labels.contains_key(key),
    })
}
