// ABOUTME: Container create requests and their validated form.
// ABOUTME: Checks name, image, port mappings, env entries, labels, and command arguments.

use super::{Checks, ListInput, ValidationError};
use crate::types::{EnvEntry, ImageRef, PortMapping, ResourceName};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A container create request as callers send it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRequest {
    #[serde(alias = "containerName")]
    pub name: String,
    #[serde(alias = "imageName")]
    pub image: String,
    #[serde(default)]
    pub ports: ListInput,
    #[serde(default)]
    pub env: ListInput,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub command: Vec<String>,
    /// Start the container once created.
    #[serde(default = "default_start")]
    pub start: bool,
}

fn default_start() -> bool {
    true
}

impl ContainerRequest {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            start: true,
            ..Default::default()
        }
    }

    pub fn ports(mut self, ports: impl Into<ListInput>) -> Self {
        self.ports = ports.into();
        self
    }

    pub fn env(mut self, env: impl Into<ListInput>) -> Self {
        self.env = env.into();
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn command<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn created_only(mut self) -> Self {
        self.start = false;
        self
    }

    pub fn validate(&self) -> Result<ContainerSpec, ValidationError> {
        let mut checks = Checks::default();

        let name = checks.name("name", &self.name);
        let image = checks.check("image", ImageRef::parse(&self.image));

        let ports: Vec<PortMapping> = self
            .ports
            .entries()
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| checks.check(format!("ports[{i}]"), PortMapping::parse(raw)))
            .collect();

        let env: Vec<EnvEntry> = self
            .env
            .entries()
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| checks.check(format!("env[{i}]"), EnvEntry::parse(raw)))
            .collect();

        checks.labels("labels", &self.labels);

        for (i, arg) in self.command.iter().enumerate() {
            if arg.contains('\0') {
                checks.fail(format!("command[{i}]"), "argument contains a NUL byte");
            }
        }

        checks.finish(|| {
            Some(ContainerSpec {
                name: name?,
                image: image?,
                ports,
                env,
                labels: self.labels.clone(),
                command: self.command.clone(),
                start: self.start,
            })
        })
    }
}

/// A container create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: ResourceName,
    pub image: ImageRef,
    pub ports: Vec<PortMapping>,
    pub env: Vec<EnvEntry>,
    pub labels: BTreeMap<String, String>,
    pub command: Vec<String>,
    pub start: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_separated_ports_and_env_are_split() {
        let spec = ContainerRequest::new("web", "nginx:latest")
            .ports("8080:80, 8443:443/tcp")
            .env("A=1,B=two=2")
            .validate()
            .unwrap();
        assert_eq!(spec.ports.len(), 2);
        assert_eq!(spec.env[1].key(), "B");
        assert_eq!(spec.env[1].value(), "two=2");
    }

    #[test]
    fn every_failing_field_is_reported() {
        let err = ContainerRequest::new("-bad", "nginx latest")
            .ports(vec!["8080:80".to_string(), "abc:80".to_string()])
            .env("=value")
            .label("", "x")
            .validate()
            .unwrap_err();
        assert!(err.has_field("name"));
        assert!(err.has_field("image"));
        assert!(err.has_field("ports[1]"));
        assert!(!err.has_field("ports[0]"));
        assert!(err.has_field("env[0]"));
        assert!(err.has_field("labels."));
        assert_eq!(err.fields.len(), 5);
    }

    #[test]
    fn request_deserializes_dashboard_field_names() {
        let request: ContainerRequest = serde_json::from_str(
            r#"{"containerName":"web","imageName":"nginx","ports":"8080:80","env":"A=1"}"#,
        )
        .unwrap();
        assert_eq!(request.name, "web");
        assert!(request.start);
        assert_eq!(request.validate().unwrap().ports[0].host_port, 8080);
    }
}
