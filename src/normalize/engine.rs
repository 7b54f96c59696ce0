// ABOUTME: Engine summary: counts and host facts from `info`, averaged usage from stats.
// ABOUTME: Reads Docker's and Podman's info layouts and both stats shapes.

use super::NormalizeError;
use super::size::parse_percent;
use crate::diagnostics::{Diagnostics, Warning};
use crate::records::{ContainerCounts, EngineFacts, EngineSummary};
use crate::transport::{RawResult, StructuredPayload};
use bollard::models::{ContainerStatsResponse, SystemInfo};
use serde::Deserialize;
use serde_json::Value;

/// Combine `info` and `stats` output with the network and volume counts.
pub fn summary(
    info: RawResult,
    usage: RawResult,
    networks: usize,
    volumes: usize,
) -> Result<EngineSummary, NormalizeError> {
    let (containers, images, engine) = match info {
        RawResult::Structured(StructuredPayload::Info(info)) => from_system_info(*info),
        RawResult::Lines(text) => from_info_line(&text)?,
        other => return Err(NormalizeError::unexpected("engine info", &other)),
    };

    let mut diagnostics = Diagnostics::default();
    let samples: Vec<(f64, f64)> = match usage {
        RawResult::Structured(StructuredPayload::Stats(stats)) => {
            stats.iter().map(sample_percentages).collect()
        }
        RawResult::Lines(text) => text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| match stats_line(line) {
                Ok(sample) => Some(sample),
                Err(reason) => {
                    diagnostics.warn(Warning::skipped_record(format!(
                        "skipping stats line: {reason}"
                    )));
                    None
                }
            })
            .collect(),
        other => return Err(NormalizeError::unexpected("container stats", &other)),
    };

    Ok(EngineSummary {
        containers,
        images,
        volumes: volumes as u64,
        networks: networks as u64,
        engine,
        cpu_percent: round2(mean(samples.iter().map(|s| s.0))),
        memory_percent: round2(mean(samples.iter().map(|s| s.1))),
    })
}

fn count(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}

fn from_system_info(info: SystemInfo) -> (ContainerCounts, u64, EngineFacts) {
    let containers = ContainerCounts {
        total: count(info.containers),
        running: count(info.containers_running),
        paused: count(info.containers_paused),
        stopped: count(info.containers_stopped),
    };
    let facts = EngineFacts {
        id: info.id.unwrap_or_default(),
        name: info.name.unwrap_or_default(),
        server_version: info.server_version.unwrap_or_default(),
        kernel_version: info.kernel_version.unwrap_or_default(),
        operating_system: info.operating_system.unwrap_or_default(),
        architecture: info.architecture.unwrap_or_default(),
        cpus: count(info.ncpu),
        memory_bytes: count(info.mem_total),
    };
    (containers, count(info.images), facts)
}

/// The fields of `docker info --format '{{json .}}'` we use.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DockerInfo {
    #[serde(rename = "ID")]
    id: Option<String>,
    name: Option<String>,
    containers: Option<i64>,
    containers_running: Option<i64>,
    containers_paused: Option<i64>,
    containers_stopped: Option<i64>,
    images: Option<i64>,
    server_version: Option<String>,
    kernel_version: Option<String>,
    operating_system: Option<String>,
    architecture: Option<String>,
    #[serde(rename = "NCPU")]
    ncpu: Option<i64>,
    mem_total: Option<i64>,
}

fn from_info_line(text: &str) -> Result<(ContainerCounts, u64, EngineFacts), NormalizeError> {
    let malformed = || NormalizeError {
        expected: "engine info",
        got: "unreadable lines",
    };
    let value: Value = serde_json::from_str(text.trim()).map_err(|_| malformed())?;

    // Podman nests everything under host/store/version.
    if let Some(host) = value.get("host") {
        let store = &value["store"];
        let text = |v: &Value| v.as_str().unwrap_or_default().to_string();
        let number = |v: &Value| v.as_u64().unwrap_or(0);
        let containers = ContainerCounts {
            total: number(&store["containerStore"]["number"]),
            running: number(&store["containerStore"]["running"]),
            paused: number(&store["containerStore"]["paused"]),
            stopped: number(&store["containerStore"]["stopped"]),
        };
        let facts = EngineFacts {
            id: String::new(),
            name: text(&host["hostname"]),
            server_version: text(&value["version"]["Version"]),
            kernel_version: text(&host["kernel"]),
            operating_system: text(&host["distribution"]["distribution"]),
            architecture: text(&host["arch"]),
            cpus: number(&host["cpus"]),
            memory_bytes: number(&host["memTotal"]),
        };
        return Ok((containers, number(&store["imageStore"]["number"]), facts));
    }

    let info: DockerInfo = serde_json::from_value(value).map_err(|_| malformed())?;
    let info = SystemInfo {
        id: info.id,
        name: info.name,
        containers: info.containers,
        containers_running: info.containers_running,
        containers_paused: info.containers_paused,
        containers_stopped: info.containers_stopped,
        images: info.images,
        server_version: info.server_version,
        kernel_version: info.kernel_version,
        operating_system: info.operating_system,
        architecture: info.architecture,
        ncpu: info.ncpu,
        mem_total: info.mem_total,
        ..Default::default()
    };
    Ok(from_system_info(info))
}

/// CPU and memory percent the way `docker stats` computes them.
fn sample_percentages(stats: &ContainerStatsResponse) -> (f64, f64) {
    let cpu_total = stats
        .cpu_stats
        .as_ref()
        .and_then(|s| s.cpu_usage.as_ref())
        .and_then(|u| u.total_usage)
        .unwrap_or(0);
    let precpu_total = stats
        .precpu_stats
        .as_ref()
        .and_then(|s| s.cpu_usage.as_ref())
        .and_then(|u| u.total_usage)
        .unwrap_or(0);
    let system = stats.cpu_stats.as_ref().and_then(|s| s.system_cpu_usage).unwrap_or(0);
    let presystem = stats
        .precpu_stats
        .as_ref()
        .and_then(|s| s.system_cpu_usage)
        .unwrap_or(0);

    let cpu_delta = cpu_total.saturating_sub(precpu_total) as f64;
    let system_delta = system.saturating_sub(presystem) as f64;
    let online_cpus = stats
        .cpu_stats
        .as_ref()
        .and_then(|s| s.online_cpus)
        .filter(|n| *n > 0)
        .unwrap_or(1) as f64;

    let cpu = if cpu_delta > 0.0 && system_delta > 0.0 {
        (cpu_delta / system_delta) * online_cpus * 100.0
    } else {
        0.0
    };

    let memory = stats.memory_stats.as_ref().map_or(0.0, |m| {
        let usage = m.usage.unwrap_or(0);
        // cgroup v2 reports inactive_file, v1 total_inactive_file.
        let cache = m
            .stats
            .as_ref()
            .and_then(|s| s.get("inactive_file").or_else(|| s.get("total_inactive_file")))
            .copied()
            .unwrap_or(0);
        match m.limit {
            Some(limit) if limit > 0 => usage.saturating_sub(cache) as f64 / limit as f64 * 100.0,
            _ => 0.0,
        }
    });

    (cpu, memory)
}

fn stats_line(line: &str) -> Result<(f64, f64), String> {
    let value: Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let percent = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .and_then(parse_percent)
            .ok_or_else(|| format!("unreadable {key}"))
    };
    Ok((percent("CPUPerc")?, percent("MemPerc")?))
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
