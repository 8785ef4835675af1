//! Perspective diffing.
//!
//! Histories are compared position by position from the oldest entry. As
//! long as both sides agree, the longer history's tail is what the other
//! side is missing. The first disagreement makes the object a conflict and
//! nothing is copied for it.

use std::collections::{BTreeMap, BTreeSet};

use oss_perspective::PerspectiveView;
use oss_types::Entry;

use crate::types::{Conflict, SyncAction, SyncPlan};

/// Compute the plan that brings `source` and `destination` into agreement.
///
/// Each perspective is read once, so the plan reflects one consistent
/// snapshot of each side.
pub fn diff(source: PerspectiveView<'_>, destination: PerspectiveView<'_>) -> SyncPlan {
    diff_histories(&source.histories(), &destination.histories())
}

/// [`diff`] over already materialized histories.
pub fn diff_histories(
    source: &BTreeMap<String, Vec<Entry>>,
    destination: &BTreeMap<String, Vec<Entry>>,
) -> SyncPlan {
    let keys: BTreeSet<&String> = source.keys().chain(destination.keys()).collect();
    let actions = keys
        .into_iter()
        .filter_map(|key| match (source.get(key), destination.get(key)) {
            (Some(src), Some(dst)) => diff_object(key, src, dst),
            (Some(src), None) => Some(SyncAction::CopyToDestination {
                object_key: key.clone(),
                entries: src.clone(),
            }),
            (None, Some(dst)) => Some(SyncAction::CopyToSource {
                object_key: key.clone(),
                entries: dst.clone(),
            }),
            (None, None) => None,
        })
        .collect();
    SyncPlan { actions }
}

/// Compare one object's two histories. `None` means they are identical.
pub fn diff_object(
    object_key: &str,
    source: &[Entry],
    destination: &[Entry],
) -> Option<SyncAction> {
    for (index, (src, dst)) in source.iter().zip(destination).enumerate() {
        if src.same_revision(dst) {
            continue;
        }
        if src.version != dst.version {
            return Some(SyncAction::Conflict(Conflict::VersionMismatch {
                object_key: object_key.to_string(),
                index,
                source_version: src.version,
                destination_version: dst.version,
            }));
        }
        return Some(SyncAction::Conflict(Conflict::HashMismatch {
            object_key: object_key.to_string(),
            version: src.version,
            source_hash: src.hash,
            destination_hash: dst.hash,
        }));
    }

    let common = source.len().min(destination.len());
    if source.len() > common {
        Some(SyncAction::CopyToDestination {
            object_key: object_key.to_string(),
            entries: source[common..].to_vec(),
        })
    } else if destination.len() > common {
        Some(SyncAction::CopyToSource {
            object_key: object_key.to_string(),
            entries: destination[common..].to_vec(),
        })
    } else {
        None
    }
}
