// ABOUTME: Image normalizer for API summaries and image JSON lines.
// ABOUTME: Entries sharing an ID are merged so each image appears once.

use super::fields::split_repo_tag;
use super::size::parse_human_size;
use super::{Listing, NormalizeError, each_line, each_object, non_empty};
use crate::diagnostics::Diagnostics;
use crate::records::{ImageRecord, NONE_SENTINEL};
use crate::transport::{RawResult, StructuredPayload};
use crate::types::{ImageId, ResourceKind};
use bollard::models::ImageSummary;
use serde::Deserialize;
use std::collections::BTreeMap;

pub fn images(raw: RawResult) -> Result<Listing<ImageRecord>, NormalizeError> {
    let mut diagnostics = Diagnostics::default();
    let records = match raw {
        RawResult::Structured(StructuredPayload::Images(summaries)) => {
            each_object(summaries, ResourceKind::Image, &mut diagnostics, |s, _| {
                from_summary(s)
            })
        }
        RawResult::Lines(text) => {
            each_line(&text, ResourceKind::Image, &mut diagnostics, |l, _| {
                from_line(l)
            })
        }
        other => return Err(NormalizeError::unexpected("image list", &other)),
    };
    Ok(Listing::new(merge_by_id(records), &diagnostics))
}

fn real_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .filter(|t| !t.is_empty() && t != "<none>:<none>")
        .collect()
}

fn record(
    id: String,
    repo_tags: Vec<String>,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
    size_bytes: u64,
    parent: Option<String>,
    labels: BTreeMap<String, String>,
) -> ImageRecord {
    let (repository, tag) = match repo_tags.first() {
        Some(first) => split_repo_tag(first),
        None => (NONE_SENTINEL.to_string(), NONE_SENTINEL.to_string()),
    };
    ImageRecord {
        id: ImageId::new(id),
        repository,
        tag,
        repo_tags,
        created_at,
        size_bytes,
        parent_id: non_empty(parent).map(ImageId::new),
        labels,
    }
}

fn from_summary(summary: ImageSummary) -> Result<ImageRecord, String> {
    let id = non_empty(Some(summary.id)).ok_or("missing ID")?;
    Ok(record(
        id,
        real_tags(summary.repo_tags),
        super::time::from_epoch(summary.created),
        u64::try_from(summary.size).unwrap_or(0),
        Some(summary.parent_id),
        summary.labels.into_iter().collect(),
    ))
}

/// Integer bytes from inspect, `"187MB"` from the table listing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeField {
    Bytes(u64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
struct ImageConfig {
    #[serde(rename = "Labels", default)]
    labels: Option<BTreeMap<String, String>>,
}

/// An `image inspect` or `images --format '{{json .}}'` line.
#[derive(Debug, Deserialize)]
struct ImageLine {
    #[serde(rename = "Id", default)]
    id: Option<String>,
    #[serde(rename = "ID", default)]
    table_id: Option<String>,
    #[serde(rename = "RepoTags", default)]
    repo_tags: Option<Vec<String>>,
    #[serde(rename = "Repository", default)]
    repository: Option<String>,
    #[serde(rename = "Tag", default)]
    tag: Option<String>,
    #[serde(rename = "Parent", alias = "ParentId", default)]
    parent: Option<String>,
    #[serde(rename = "Created", default)]
    created: Option<super::fields::FlexTime>,
    #[serde(rename = "CreatedAt", default)]
    created_at: Option<super::fields::FlexTime>,
    #[serde(rename = "Size", default)]
    size: Option<SizeField>,
    #[serde(rename = "Config", default)]
    config: Option<ImageConfig>,
    /// Podman repeats the config labels at the top level.
    #[serde(rename = "Labels", default)]
    labels: Option<BTreeMap<String, String>>,
}

fn from_line(line: ImageLine) -> Result<ImageRecord, String> {
    let id = non_empty(line.id)
        .or(non_empty(line.table_id))
        .ok_or("missing ID")?;

    let mut repo_tags = real_tags(line.repo_tags.unwrap_or_default());
    if repo_tags.is_empty()
        && let (Some(repo), Some(tag)) = (line.repository, line.tag)
        && repo != NONE_SENTINEL
        && tag != NONE_SENTINEL
    {
        repo_tags.push(format!("{repo}:{tag}"));
    }

    let size_bytes = match line.size {
        Some(SizeField::Bytes(bytes)) => bytes,
        Some(SizeField::Text(text)) => {
            parse_human_size(&text).ok_or_else(|| format!("unreadable size {text:?}"))?
        }
        None => 0,
    };

    let created_at = line
        .created
        .as_ref()
        .and_then(|t| t.instant())
        .or_else(|| line.created_at.as_ref().and_then(|t| t.instant()));

    let labels = line
        .config
        .and_then(|c| c.labels)
        .or(line.labels)
        .unwrap_or_default();

    Ok(record(
        id.trim().to_string(),
        repo_tags,
        created_at,
        size_bytes,
        line.parent,
        labels,
    ))
}

/// The table listing prints one line per tag; fold them into one record.
fn merge_by_id(records: Vec<ImageRecord>) -> Vec<ImageRecord> {
    let mut merged: Vec<ImageRecord> = Vec::with_capacity(records.len());
    for record in records {
        match merged.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                for tag in record.repo_tags {
                    if !existing.repo_tags.contains(&tag) {
                        existing.repo_tags.push(tag);
                    }
                }
                if existing.repository == NONE_SENTINEL
                    && let Some(first) = existing.repo_tags.first()
                {
                    let (repository, tag) = split_repo_tag(first);
                    existing.repository = repository;
                    existing.tag = tag;
                }
            }
            None => merged.push(record),
        }
    }
    merged
}
