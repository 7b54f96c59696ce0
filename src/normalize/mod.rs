// ABOUTME: Turns raw transport results into canonical records, one normalizer per kind.
// ABOUTME: Unreadable lines are dropped and counted; the rest of the listing survives.

mod container;
mod engine;
pub mod fields;
mod image;
mod network;
pub mod size;
pub mod time;
mod volume;

pub use container::containers;
pub use engine::summary;
pub use image::images;
pub use network::networks;
pub use volume::volumes;

use crate::diagnostics::{Diagnostics, Warning};
use crate::transport::RawResult;
use crate::types::ResourceKind;
use serde::de::DeserializeOwned;

/// A normalized list and how many raw entries could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Listing<T> {
    fn new(records: Vec<T>, diagnostics: &Diagnostics) -> Self {
        if diagnostics.unreadable_fields() > 0 {
            tracing::debug!(
                fields = diagnostics.unreadable_fields(),
                "kept records with unreadable fields"
            );
        }
        Self {
            records,
            skipped: diagnostics.skipped(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// The result was not of a shape this normalizer reads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected} output, got {got}")]
pub struct NormalizeError {
    pub expected: &'static str,
    pub got: &'static str,
}

impl NormalizeError {
    fn unexpected(expected: &'static str, raw: &RawResult) -> Self {
        Self {
            expected,
            got: raw.shape(),
        }
    }
}

/// Parse newline-delimited JSON, converting each object independently.
///
/// A line that is not JSON, or that `convert` rejects, is recorded as skipped.
fn each_line<R, T>(
    text: &str,
    kind: ResourceKind,
    diagnostics: &mut Diagnostics,
    mut convert: impl FnMut(R, &mut Diagnostics) -> Result<T, String>,
) -> Vec<T>
where
    R: DeserializeOwned,
{
    let mut records = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parsed = serde_json::from_str::<R>(line)
            .map_err(|e| e.to_string())
            .and_then(|raw| convert(raw, diagnostics));
        match parsed {
            Ok(record) => records.push(record),
            Err(reason) => diagnostics.warn(Warning::skipped_record(format!(
                "skipping {kind} line {}: {reason}",
                n + 1
            ))),
        }
    }
    records
}

/// Convert structured objects, skipping the ones `convert` rejects.
fn each_object<R, T>(
    objects: Vec<R>,
    kind: ResourceKind,
    diagnostics: &mut Diagnostics,
    mut convert: impl FnMut(R, &mut Diagnostics) -> Result<T, String>,
) -> Vec<T> {
    let mut records = Vec::new();
    for (n, object) in objects.into_iter().enumerate() {
        match convert(object, diagnostics) {
            Ok(record) => records.push(record),
            Err(reason) => diagnostics.warn(Warning::skipped_record(format!(
                "skipping {kind} #{}: {reason}",
                n + 1
            ))),
        }
    }
    records
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
