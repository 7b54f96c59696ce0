// ABOUTME: Output formatting for CLI feedback and listings.
// ABOUTME: Supports normal (tables), quiet (keys only), and JSON-lines output modes.

use crate::records::{ContainerRecord, EngineSummary, ImageRecord, NetworkRecord, VolumeRecord};
use serde::Serialize;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Human-friendly tables
    #[default]
    Normal,
    /// One key per line, for piping
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// A record the CLI can print in every mode.
pub trait Row: Serialize {
    /// Column headings for normal mode.
    const HEADINGS: &'static [&'static str];

    /// The primary key, printed alone in quiet mode.
    fn key(&self) -> String;

    /// One cell per heading.
    fn cells(&self) -> Vec<String>;
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Render a listing and its skipped-line count.
    pub fn rows<T: Row>(&self, rows: &[T], skipped: usize) -> String {
        let mut out = String::new();
        match self.mode {
            OutputMode::Normal => {
                out.push_str(&table(T::HEADINGS, rows.iter().map(Row::cells)));
                if skipped > 0 {
                    out.push_str(&format!("({skipped} unreadable entries skipped)\n"));
                }
            }
            OutputMode::Quiet => {
                for row in rows {
                    out.push_str(&row.key());
                    out.push('\n');
                }
            }
            OutputMode::Json => {
                for row in rows {
                    if let Ok(json) = serde_json::to_string(row) {
                        out.push_str(&json);
                        out.push('\n');
                    }
                }
            }
        }
        out
    }

    /// Render the engine summary.
    pub fn summary(&self, summary: &EngineSummary) -> String {
        match self.mode {
            OutputMode::Json => serde_json::to_string(summary)
                .map(|json| json + "\n")
                .unwrap_or_default(),
            OutputMode::Quiet => format!("{}\n", summary.engine.server_version),
            OutputMode::Normal => {
                let e = &summary.engine;
                let c = &summary.containers;
                [
                    format!("Engine:      {} ({})", e.server_version, e.operating_system),
                    format!("Kernel:      {} {}", e.kernel_version, e.architecture),
                    format!("CPUs:        {}", e.cpus),
                    format!("Memory:      {}", human_bytes(e.memory_bytes)),
                    format!(
                        "Containers:  {} ({} running, {} paused, {} stopped)",
                        c.total, c.running, c.paused, c.stopped
                    ),
                    format!("Images:      {}", summary.images),
                    format!("Networks:    {}", summary.networks),
                    format!("Volumes:     {}", summary.volumes),
                    format!("CPU usage:   {:.2}%", summary.cpu_percent),
                    format!("Mem usage:   {:.2}%", summary.memory_percent),
                ]
                .join("\n")
                    + "\n"
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str, kind: Option<&str>) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    kind,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
}

fn table(headings: &[&str], rows: impl Iterator<Item = Vec<String>>) -> String {
    let rows: Vec<Vec<String>> = rows.collect();
    let widths: Vec<usize> = headings
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        padded.join("  ").trim_end().to_string() + "\n"
    };

    let mut out = line(headings.iter().map(|h| h.to_string()).collect());
    for row in rows {
        out.push_str(&line(row));
    }
    out
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}

fn created(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

impl Row for ContainerRecord {
    const HEADINGS: &'static [&'static str] = &["ID", "NAME", "IMAGE", "STATE", "PORTS", "CREATED"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn cells(&self) -> Vec<String> {
        let ports = self
            .ports
            .iter()
            .map(|p| match p.host_port {
                Some(host) => format!("{host}->{}/{}", p.container_port, p.protocol.as_str()),
                None => format!("{}/{}", p.container_port, p.protocol.as_str()),
            })
            .collect::<Vec<_>>()
            .join(", ");
        vec![
            self.id.short().to_string(),
            self.names.join(","),
            self.image.clone(),
            self.state.to_string(),
            ports,
            created(self.created_at),
        ]
    }
}

impl Row for ImageRecord {
    const HEADINGS: &'static [&'static str] = &["ID", "REPOSITORY", "TAG", "SIZE", "CREATED"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.short().to_string(),
            self.repository.clone(),
            self.tag.clone(),
            human_bytes(self.size_bytes),
            created(self.created_at),
        ]
    }
}

impl Row for NetworkRecord {
    const HEADINGS: &'static [&'static str] = &["ID", "NAME", "DRIVER", "SCOPE", "SUBNET"];

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.short().to_string(),
            self.name.clone(),
            self.driver.clone(),
            format!("{:?}", self.scope).to_lowercase(),
            self.ipam
                .as_ref()
                .and_then(|i| i.subnet.clone())
                .unwrap_or_default(),
        ]
    }
}

impl Row for VolumeRecord {
    const HEADINGS: &'static [&'static str] = &["NAME", "DRIVER", "MOUNTPOINT"];

    fn key(&self) -> String {
        self.name.clone()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.driver.clone(),
            self.mountpoint.clone(),
        ]
    }
}
