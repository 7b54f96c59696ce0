// ABOUTME: The operation model every transport accepts and the raw results it returns.
// ABOUTME: Requests carry only validated values; results stay in the transport's native shape.

use crate::types::{ResourceKind, ResourceName};
use crate::validate::{
    ContainerSpec, ImageSpec, ListFilter, NetworkSpec, RemoveTarget, VolumeSpec,
};
use bollard::models::{
    ContainerStatsResponse, ContainerSummary, ImageSummary, Network, SystemInfo, Volume,
};
use std::fmt;
use std::time::Duration;

/// A fully described runtime operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    List {
        kind: ResourceKind,
        filter: ListFilter,
    },
    Create(CreateSpec),
    Remove {
        kind: ResourceKind,
        target: RemoveTarget,
        force: bool,
    },
    Lifecycle {
        action: LifecycleAction,
        target: ResourceName,
        /// Seconds the runtime waits before killing on stop/restart.
        grace: Option<Duration>,
    },
    Ping,
    Info,
    /// One-shot CPU and memory samples for running containers.
    Usage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateSpec {
    Container(ContainerSpec),
    Image(ImageSpec),
    Network(NetworkSpec),
    Volume(VolumeSpec),
}

impl CreateSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            CreateSpec::Container(_) => ResourceKind::Container,
            CreateSpec::Image(_) => ResourceKind::Image,
            CreateSpec::Network(_) => ResourceKind::Network,
            CreateSpec::Volume(_) => ResourceKind::Volume,
        }
    }

    /// The name or reference the caller asked for.
    pub fn subject(&self) -> String {
        match self {
            CreateSpec::Container(spec) => spec.name.to_string(),
            CreateSpec::Image(spec) => spec.reference.to_string(),
            CreateSpec::Network(spec) => spec.name.to_string(),
            CreateSpec::Volume(spec) => spec.name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    Start,
    Stop,
    Restart,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Restart => "restart",
        }
    }
}

/// What a request does, independent of its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Create,
    Remove,
    Lifecycle(LifecycleAction),
    Ping,
    Info,
    Usage,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::List => f.write_str("list"),
            Action::Create => f.write_str("create"),
            Action::Remove => f.write_str("remove"),
            Action::Lifecycle(action) => f.write_str(action.as_str()),
            Action::Ping => f.write_str("ping"),
            Action::Info => f.write_str("info"),
            Action::Usage => f.write_str("usage"),
        }
    }
}

impl Request {
    pub fn action(&self) -> Action {
        match self {
            Request::List { .. } => Action::List,
            Request::Create(_) => Action::Create,
            Request::Remove { .. } => Action::Remove,
            Request::Lifecycle { action, .. } => Action::Lifecycle(*action),
            Request::Ping => Action::Ping,
            Request::Info => Action::Info,
            Request::Usage => Action::Usage,
        }
    }

    /// The resource kind this request addresses, if any.
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            Request::List { kind, .. } | Request::Remove { kind, .. } => Some(*kind),
            Request::Create(spec) => Some(spec.kind()),
            Request::Lifecycle { .. } => Some(ResourceKind::Container),
            Request::Ping | Request::Info | Request::Usage => None,
        }
    }

    /// The named resource this request addresses, if any.
    pub fn subject(&self) -> Option<String> {
        match self {
            Request::Create(spec) => Some(spec.subject()),
            Request::Remove { target, .. } => Some(target.to_string()),
            Request::Lifecycle { target, .. } => Some(target.to_string()),
            _ => None,
        }
    }

    /// Read-only requests can be retried without changing runtime state.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self.action(),
            Action::List | Action::Ping | Action::Info | Action::Usage
        )
    }
}

/// A transport's answer before normalization.
#[derive(Debug)]
pub enum RawResult {
    /// Typed objects from the structured client.
    Structured(StructuredPayload),
    /// Newline-delimited JSON from the command-line tool.
    Lines(String),
    /// Key assigned by the runtime to a newly created resource.
    Created(String),
    Done,
}

#[derive(Debug)]
pub enum StructuredPayload {
    Containers(Vec<ContainerSummary>),
    Images(Vec<ImageSummary>),
    Networks(Vec<Network>),
    Volumes(Vec<Volume>),
    Info(Box<SystemInfo>),
    Stats(Vec<ContainerStatsResponse>),
}

impl RawResult {
    pub fn shape(&self) -> &'static str {
        match self {
            RawResult::Structured(_) => "structured",
            RawResult::Lines(_) => "lines",
            RawResult::Created(_) => "created",
            RawResult::Done => "done",
        }
    }
}
