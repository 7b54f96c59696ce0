// ABOUTME: Builds argument vectors for the runtime's command-line tool.
// ABOUTME: Every value is a separate argv entry; nothing is interpreted by a shell.

use crate::transport::request::LifecycleAction;
use crate::types::ResourceKind;
use crate::validate::{ContainerSpec, ListFilter, NetworkSpec, RemoveTarget, VolumeSpec};
use std::time::Duration;

const JSON_LINES: &str = "{{json .}}";

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn push_filter(argv: &mut Vec<String>, key: &str, value: &str) {
    argv.push("--filter".to_string());
    argv.push(format!("{key}={value}"));
}

fn push_filters(argv: &mut Vec<String>, kind: ResourceKind, filter: &ListFilter) {
    if let Some(ref id) = filter.id
        && matches!(kind, ResourceKind::Container | ResourceKind::Network)
    {
        push_filter(argv, "id", id);
    }
    if let Some(ref name) = filter.name
        && kind != ResourceKind::Image
    {
        push_filter(argv, "name", name);
    }
    if let Some(ref reference) = filter.reference
        && kind == ResourceKind::Image
    {
        push_filter(argv, "reference", reference);
    }
    for label in &filter.labels {
        push_filter(argv, "label", label);
    }
}

/// `ps` prints one JSON object per container.
pub(crate) fn list_containers(filter: &ListFilter) -> Vec<String> {
    let mut argv = args(&["ps", "--no-trunc", "--format", JSON_LINES]);
    if filter.all {
        argv.push("--all".to_string());
    }
    if filter.size {
        argv.push("--size".to_string());
    }
    push_filters(&mut argv, ResourceKind::Container, filter);
    argv
}

/// Keys of matching images, networks, or volumes, one per line.
pub(crate) fn list_keys(kind: ResourceKind, filter: &ListFilter) -> Vec<String> {
    let mut argv = match kind {
        ResourceKind::Image => {
            let mut argv = args(&["images", "--quiet", "--no-trunc"]);
            if filter.all {
                argv.push("--all".to_string());
            }
            argv
        }
        ResourceKind::Network => args(&["network", "ls", "--quiet", "--no-trunc"]),
        ResourceKind::Volume => args(&["volume", "ls", "--quiet"]),
        ResourceKind::Container => return list_containers(filter),
    };
    push_filters(&mut argv, kind, filter);
    argv
}

/// Full objects for the given keys, one JSON object per line.
pub(crate) fn inspect(kind: ResourceKind, keys: &[String]) -> Vec<String> {
    let mut argv = match kind {
        ResourceKind::Image => args(&["image", "inspect"]),
        ResourceKind::Network => args(&["network", "inspect"]),
        ResourceKind::Volume => args(&["volume", "inspect"]),
        ResourceKind::Container => args(&["container", "inspect"]),
    };
    argv.push("--format".to_string());
    argv.push(JSON_LINES.to_string());
    argv.extend(keys.iter().cloned());
    argv
}

/// Create without starting or pulling; the container ID is printed on stdout.
pub(crate) fn create_container(spec: &ContainerSpec) -> Vec<String> {
    let mut argv = args(&["create", "--pull", "never", "--name"]);
    argv.push(spec.name.to_string());
    for port in &spec.ports {
        argv.push("--publish".to_string());
        argv.push(port.to_string());
    }
    for entry in &spec.env {
        argv.push("--env".to_string());
        argv.push(entry.to_string());
    }
    for (key, value) in &spec.labels {
        argv.push("--label".to_string());
        argv.push(format!("{key}={value}"));
    }
    argv.push(spec.image.to_string());
    argv.extend(spec.command.iter().cloned());
    argv
}

pub(crate) fn pull(reference: &str, podman: bool, tls_verify: bool) -> Vec<String> {
    let mut argv = args(&["pull", "--quiet"]);
    if podman && !tls_verify {
        argv.push("--tls-verify=false".to_string());
    }
    argv.push(reference.to_string());
    argv
}

pub(crate) fn create_network(spec: &NetworkSpec) -> Vec<String> {
    let mut argv = args(&["network", "create"]);
    if let Some(ref driver) = spec.driver {
        argv.push("--driver".to_string());
        argv.push(driver.to_string());
    }
    if spec.internal {
        argv.push("--internal".to_string());
    }
    if spec.enable_ipv6 {
        argv.push("--ipv6".to_string());
    }
    if spec.attachable {
        argv.push("--attachable".to_string());
    }
    if let Some(ref ipam) = spec.ipam {
        argv.push("--subnet".to_string());
        argv.push(ipam.subnet.to_string());
        if let Some(gateway) = ipam.gateway {
            argv.push("--gateway".to_string());
            argv.push(gateway.to_string());
        }
    }
    for (key, value) in &spec.labels {
        argv.push("--label".to_string());
        argv.push(format!("{key}={value}"));
    }
    for (key, value) in &spec.options {
        argv.push("--opt".to_string());
        argv.push(format!("{key}={value}"));
    }
    argv.push(spec.name.to_string());
    argv
}

pub(crate) fn create_volume(spec: &VolumeSpec) -> Vec<String> {
    let mut argv = args(&["volume", "create"]);
    if let Some(ref driver) = spec.driver {
        argv.push("--driver".to_string());
        argv.push(driver.to_string());
    }
    for (key, value) in &spec.options {
        argv.push("--opt".to_string());
        argv.push(format!("{key}={value}"));
    }
    for (key, value) in &spec.labels {
        argv.push("--label".to_string());
        argv.push(format!("{key}={value}"));
    }
    argv.push(spec.name.to_string());
    argv
}

pub(crate) fn remove(kind: ResourceKind, target: &RemoveTarget, force: bool) -> Vec<String> {
    let mut argv = match kind {
        ResourceKind::Container => args(&["rm"]),
        ResourceKind::Image => args(&["rmi"]),
        ResourceKind::Network => args(&["network", "rm"]),
        ResourceKind::Volume => args(&["volume", "rm"]),
    };
    // `network rm` has no force flag on Docker.
    if force && kind != ResourceKind::Network {
        argv.push("--force".to_string());
    }
    argv.push(target.to_string());
    argv
}

pub(crate) fn lifecycle(action: LifecycleAction, target: &str, grace: Option<Duration>) -> Vec<String> {
    let mut argv = args(&[action.as_str()]);
    if let Some(grace) = grace
        && action != LifecycleAction::Start
    {
        // `-t` is accepted by both Docker and Podman for stop and restart.
        argv.push("-t".to_string());
        argv.push(grace.as_secs().to_string());
    }
    argv.push(target.to_string());
    argv
}

pub(crate) fn ping() -> Vec<String> {
    args(&["version", "--format", "{{.Server.Version}}"])
}

pub(crate) fn info() -> Vec<String> {
    args(&["info", "--format", JSON_LINES])
}

pub(crate) fn usage() -> Vec<String> {
    args(&["stats", "--no-stream", "--no-trunc", "--format", JSON_LINES])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{ContainerRequest, NetworkRequest, RemoveRequest};

    #[test]
    fn container_create_never_pulls_and_keeps_values_whole() {
        let spec = ContainerRequest::new("web", "nginx:latest")
            .ports("8080:80")
            .env(vec!["GREETING=hello world; rm -rf /".to_string()])
            .command(["nginx", "-g", "daemon off;"])
            .validate()
            .unwrap();

        let argv = create_container(&spec);

        assert_eq!(
            argv,
            vec![
                "create",
                "--pull",
                "never",
                "--name",
                "web",
                "--publish",
                "8080:80/tcp",
                "--env",
                "GREETING=hello world; rm -rf /",
                "nginx:latest",
                "nginx",
                "-g",
                "daemon off;",
            ]
        );
    }

    #[test]
    fn network_create_carries_ipam() {
        let spec = NetworkRequest::new("backend")
            .driver("bridge")
            .subnet("10.10.0.0/24")
            .gateway("10.10.0.1")
            .internal()
            .validate()
            .unwrap();

        let argv = create_network(&spec);

        assert_eq!(
            argv,
            vec![
                "network",
                "create",
                "--driver",
                "bridge",
                "--internal",
                "--subnet",
                "10.10.0.0/24",
                "--gateway",
                "10.10.0.1",
                "backend",
            ]
        );
    }

    #[test]
    fn forced_network_removal_drops_the_flag() {
        let target = RemoveRequest::forced("backend")
            .validate(ResourceKind::Network)
            .unwrap();
        assert_eq!(
            remove(ResourceKind::Network, &target, true),
            vec!["network", "rm", "backend"]
        );

        let target = RemoveRequest::forced("web")
            .validate(ResourceKind::Container)
            .unwrap();
        assert_eq!(
            remove(ResourceKind::Container, &target, true),
            vec!["rm", "--force", "web"]
        );
    }

    #[test]
    fn stop_passes_grace_seconds() {
        assert_eq!(
            lifecycle(LifecycleAction::Stop, "web", Some(Duration::from_secs(3))),
            vec!["stop", "-t", "3", "web"]
        );
        assert_eq!(
            lifecycle(LifecycleAction::Start, "web", Some(Duration::from_secs(3))),
            vec!["start", "web"]
        );
    }

    #[test]
    fn list_filters_follow_kind() {
        let filter = ListFilter::all().with_label("tier=db").with_name("data");
        assert_eq!(
            list_keys(ResourceKind::Volume, &filter),
            vec!["volume", "ls", "--quiet", "--filter", "name=data", "--filter", "label=tier=db"]
        );
        assert_eq!(
            list_containers(&ListFilter::all().with_size()),
            vec!["ps", "--no-trunc", "--format", "{{json .}}", "--all", "--size"]
        );
    }
}
