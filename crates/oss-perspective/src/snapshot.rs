//! Snapshot format for persisting a perspective.
//!
//! A snapshot is a JSON document:
//!
//! ```text
//! {"format":1,"objects":{"k1":[{"version":1,"hash":"<hex>"},{"version":2,"hash":"<hex>"}]}}
//! ```
//!
//! Object keys are emitted in sorted order, so equal perspectives produce
//! byte-identical snapshots.

use serde::{Deserialize, Serialize};

use crate::error::{PerspectiveError, PerspectiveResult};
use crate::perspective::ObjectMap;

/// Current snapshot format number.
pub const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    format: u32,
    objects: &'a ObjectMap,
}

#[derive(Deserialize)]
struct SnapshotDocument {
    format: u32,
    objects: ObjectMap,
}

pub(crate) fn encode(objects: &ObjectMap) -> PerspectiveResult<Vec<u8>> {
    serde_json::to_vec(&SnapshotRef {
        format: SNAPSHOT_FORMAT,
        objects,
    })
    .map_err(|e| PerspectiveError::Serialization(e.to_string()))
}

pub(crate) fn decode(bytes: &[u8]) -> PerspectiveResult<ObjectMap> {
    let document: SnapshotDocument = serde_json::from_slice(bytes)
        .map_err(|e| PerspectiveError::Serialization(e.to_string()))?;
    if document.format != SNAPSHOT_FORMAT {
        return Err(PerspectiveError::UnsupportedFormat(document.format));
    }
    validate(&document.objects)?;
    Ok(document.objects)
}

fn validate(objects: &ObjectMap) -> PerspectiveResult<()> {
    for (key, history) in objects {
        if history.is_empty() {
            return Err(PerspectiveError::InvalidSnapshot(format!(
                "object {key} has an empty history"
            )));
        }
        let mut previous = 0;
        for revision in history {
            if revision.version <= previous {
                return Err(PerspectiveError::InvalidSnapshot(format!(
                    "object {key}: version {} does not follow {previous}",
                    revision.version
                )));
            }
            previous = revision.version;
        }
    }
    Ok(())
}
