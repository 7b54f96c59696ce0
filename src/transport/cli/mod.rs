// ABOUTME: Command-line transport: one child process of docker or podman per call.
// ABOUTME: Captures stdout, stderr, and exit status; the child is killed if the call is dropped.

mod args;

use super::Transport;
use super::failure::TransportFailure;
use super::request::{CreateSpec, RawResult, Request};
use super::types::{RuntimeType, TransportKind};
use crate::types::ResourceKind;
use crate::validate::ListFilter;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Transport that drives the runtime's command-line tool.
#[derive(Debug, Clone)]
pub struct CliTransport {
    binary: String,
    runtime_type: RuntimeType,
    tls_verify: bool,
}

impl CliTransport {
    pub fn new(binary: impl Into<String>, runtime_type: RuntimeType) -> Self {
        Self {
            binary: binary.into(),
            runtime_type,
            tls_verify: true,
        }
    }

    /// Whether registry TLS certificates are verified on pull (Podman only).
    pub fn with_tls_verify(mut self, tls_verify: bool) -> Self {
        self.tls_verify = tls_verify;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run the tool and return its stdout.
    async fn run(&self, argv: Vec<String>) -> Result<String, TransportFailure> {
        tracing::debug!(binary = %self.binary, ?argv, "running runtime command");

        let output = Command::new(&self.binary)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TransportFailure::connection(format!("failed to run {}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            return Err(TransportFailure::Process {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|e| TransportFailure::malformed(format!("non-UTF-8 output: {e}")))
    }

    async fn list(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
    ) -> Result<RawResult, TransportFailure> {
        if kind == ResourceKind::Container {
            let stdout = self.run(args::list_containers(filter)).await?;
            return Ok(RawResult::Lines(stdout));
        }

        // The list commands omit fields (IPAM, labels, creation time) that
        // inspect reports, so list keys first and inspect them in one call.
        // A resource removed between the two calls fails the inspect; one
        // more round settles it.
        let mut attempt = 0;
        loop {
            let keys = self.list_keys(kind, filter).await?;
            if keys.is_empty() {
                return Ok(RawResult::Lines(String::new()));
            }
            match self.run(args::inspect(kind, &keys)).await {
                Ok(stdout) => return Ok(RawResult::Lines(stdout)),
                Err(TransportFailure::Process { .. }) if attempt == 0 => {
                    attempt += 1;
                    tracing::debug!(%kind, "inspect raced a removal, listing again");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list_keys(
        &self,
        kind: ResourceKind,
        filter: &ListFilter,
    ) -> Result<Vec<String>, TransportFailure> {
        let stdout = self.run(args::list_keys(kind, filter)).await?;
        let mut keys: Vec<String> = Vec::new();
        // An image with several tags is listed once per tag.
        for key in stdout.lines().map(str::trim).filter(|k| !k.is_empty()) {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
        Ok(keys)
    }

    async fn create(&self, spec: &CreateSpec) -> Result<RawResult, TransportFailure> {
        let argv = match spec {
            CreateSpec::Container(spec) => args::create_container(spec),
            CreateSpec::Image(spec) => {
                let podman = self.runtime_type == RuntimeType::Podman;
                let argv = args::pull(&spec.reference.to_string(), podman, self.tls_verify);
                self.run(argv).await?;
                return Ok(RawResult::Done);
            }
            CreateSpec::Network(spec) => args::create_network(spec),
            CreateSpec::Volume(spec) => args::create_volume(spec),
        };

        let stdout = self.run(argv).await?;
        // Warnings may precede the key; the key is the last line.
        let key = stdout
            .lines()
            .map(str::trim)
            .rfind(|l| !l.is_empty())
            .ok_or_else(|| TransportFailure::malformed("create printed no identifier"))?;
        Ok(RawResult::Created(key.to_string()))
    }
}

#[async_trait]
impl Transport for CliTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Cli
    }

    async fn invoke(&self, request: &Request) -> Result<RawResult, TransportFailure> {
        match request {
            Request::List { kind, filter } => self.list(*kind, filter).await,
            Request::Create(spec) => self.create(spec).await,
            Request::Remove {
                kind,
                target,
                force,
            } => {
                self.run(args::remove(*kind, target, *force)).await?;
                Ok(RawResult::Done)
            }
            Request::Lifecycle {
                action,
                target,
                grace,
            } => {
                self.run(args::lifecycle(*action, target.as_str(), *grace))
                    .await?;
                Ok(RawResult::Done)
            }
            Request::Ping => {
                self.run(args::ping()).await?;
                Ok(RawResult::Done)
            }
            Request::Info => Ok(RawResult::Lines(self.run(args::info()).await?)),
            Request::Usage => Ok(RawResult::Lines(self.run(args::usage()).await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_a_connection_failure() {
        let transport = CliTransport::new("/nonexistent/dockyard-test-binary", RuntimeType::Docker);

        let err = transport.invoke(&Request::Ping).await.unwrap_err();

        assert!(matches!(err, TransportFailure::Connection { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn nonzero_exit_reports_stderr() {
        // `false` ignores its arguments and exits 1.
        let transport = CliTransport::new("false", RuntimeType::Docker);

        let err = transport.invoke(&Request::Ping).await.unwrap_err();

        assert!(
            matches!(
                err,
                TransportFailure::Process {
                    exit_code: Some(1),
                    ..
                }
            ),
            "{err:?}"
        );
    }

    /// Whether `pid` still names a live (not yet exited) process.
    #[cfg(target_os = "linux")]
    fn is_running(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .and_then(|rest| rest.trim().chars().next())
                .is_some_and(|state| state != 'Z' && state != 'X'),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn abandoned_call_kills_the_child() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = dir.path().join("slow-runtime");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho $$ > {}\nexec sleep 30\n", pid_file.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let transport = CliTransport::new(script.to_string_lossy(), RuntimeType::Docker);

        let call = tokio::time::timeout(
            Duration::from_millis(300),
            transport.invoke(&Request::Ping),
        )
        .await;
        assert!(call.is_err(), "call should still be running at the deadline");

        let mut pid = None;
        for _ in 0..50 {
            if let Some(p) = std::fs::read_to_string(&pid_file)
                .ok()
                .and_then(|s| s.trim().parse::<u32>().ok())
            {
                pid = Some(p);
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let pid = pid.expect("script never recorded its pid");

        let mut alive = true;
        for _ in 0..100 {
            if !is_running(pid) {
                alive = false;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!alive, "child {pid} outlived the dropped call");
    }
}
