// ABOUTME: Volume normalizer for API objects and `volume inspect`/`ls` JSON lines.
// ABOUTME: Volumes are keyed by name; an entry without one is skipped.

use super::fields::{FlexTime, LabelSet};
use super::{Listing, NormalizeError, each_line, each_object};
use crate::diagnostics::Diagnostics;
use crate::records::{Scope, VolumeRecord};
use crate::transport::{RawResult, StructuredPayload};
use crate::types::ResourceKind;
use bollard::models::Volume;
use serde::Deserialize;

pub fn volumes(raw: RawResult) -> Result<Listing<VolumeRecord>, NormalizeError> {
    let mut diagnostics = Diagnostics::default();
    let records = match raw {
        RawResult::Structured(StructuredPayload::Volumes(volumes)) => {
            each_object(volumes, ResourceKind::Volume, &mut diagnostics, |v, _| {
                from_api(v)
            })
        }
        RawResult::Lines(text) => {
            each_line(&text, ResourceKind::Volume, &mut diagnostics, |l, _| {
                from_line(l)
            })
        }
        other => return Err(NormalizeError::unexpected("volume list", &other)),
    };
    Ok(Listing::new(records, &diagnostics))
}

fn from_api(volume: Volume) -> Result<VolumeRecord, String> {
    if volume.name.trim().is_empty() {
        return Err("missing name".to_string());
    }
    Ok(VolumeRecord {
        name: volume.name,
        driver: volume.driver,
        mountpoint: volume.mountpoint,
        labels: volume.labels.into_iter().collect(),
        scope: Scope::from_runtime(&volume.scope.map(|s| s.to_string()).unwrap_or_default()),
        created_at: volume.created_at.and_then(super::time::known),
    })
}

#[derive(Debug, Deserialize)]
struct VolumeLine {
    #[serde(rename = "Name", alias = "name")]
    name: String,
    #[serde(rename = "Driver", alias = "driver", default)]
    driver: String,
    #[serde(rename = "Mountpoint", alias = "mountpoint", default)]
    mountpoint: String,
    #[serde(rename = "Labels", alias = "labels", default)]
    labels: Option<LabelSet>,
    #[serde(rename = "Scope", alias = "scope", default)]
    scope: String,
    #[serde(rename = "CreatedAt", alias = "createdAt", default)]
    created_at: Option<FlexTime>,
}

fn from_line(line: VolumeLine) -> Result<VolumeRecord, String> {
    if line.name.trim().is_empty() {
        return Err("missing name".to_string());
    }
    Ok(VolumeRecord {
        name: line.name,
        driver: line.driver,
        mountpoint: line.mountpoint,
        labels: line.labels.map(LabelSet::into_map).unwrap_or_default(),
        scope: Scope::from_runtime(&line.scope),
        created_at: line.created_at.and_then(|t| t.instant()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_line_with_null_labels() {
        let line = r#"{"CreatedAt":"2023-11-14T22:13:20Z","Driver":"local","Labels":null,"Mountpoint":"/var/lib/docker/volumes/data/_data","Name":"data","Options":null,"Scope":"local"}"#;

        let listing = volumes(RawResult::Lines(line.to_string())).unwrap();
        let volume = &listing.records[0];

        assert_eq!(volume.name, "data");
        assert!(volume.labels.is_empty());
        assert_eq!(volume.created_at.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn line_without_name_is_skipped() {
        let text = "{\"Driver\":\"local\"}\n{\"Name\":\"data\",\"Driver\":\"local\"}\n";

        let listing = volumes(RawResult::Lines(text.to_string())).unwrap();

        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.skipped, 1);
    }
}
