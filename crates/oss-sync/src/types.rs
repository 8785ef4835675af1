use std::fmt;

use oss_store::StoreError;
use oss_types::{ContentHash, Entry, Version};
use serde::{Deserialize, Serialize};

/// Which way a copy flows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ToDestination,
    ToSource,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToDestination => write!(f, "source -> destination"),
            Direction::ToSource => write!(f, "destination -> source"),
        }
    }
}

/// Two histories of the same object that disagree on their common prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// Both sides recorded `version` with different content.
    HashMismatch {
        object_key: String,
        version: Version,
        source_hash: ContentHash,
        destination_hash: ContentHash,
    },
    /// At position `index` the two histories hold different versions.
    VersionMismatch {
        object_key: String,
        index: usize,
        source_version: Version,
        destination_version: Version,
    },
}

impl Conflict {
    pub fn object_key(&self) -> &str {
        match self {
            Conflict::HashMismatch { object_key, .. }
            | Conflict::VersionMismatch { object_key, .. } => object_key,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::HashMismatch {
                object_key,
                version,
                source_hash,
                destination_hash,
            } => write!(
                f,
                "{object_key}@{version}: source {} vs destination {}",
                source_hash.short_hex(),
                destination_hash.short_hex()
            ),
            Conflict::VersionMismatch {
                object_key,
                index,
                source_version,
                destination_version,
            } => write!(
                f,
                "{object_key}: history position {index} holds version {source_version} \
                 on source and {destination_version} on destination"
            ),
        }
    }
}

/// What to do for one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncAction {
    /// Copy `entries`, oldest first, from source to destination.
    CopyToDestination { object_key: String, entries: Vec<Entry> },
    /// Copy `entries`, oldest first, from destination to source.
    CopyToSource { object_key: String, entries: Vec<Entry> },
    /// Leave both sides alone and report.
    Conflict(Conflict),
}

impl SyncAction {
    pub fn object_key(&self) -> &str {
        match self {
            SyncAction::CopyToDestination { object_key, .. }
            | SyncAction::CopyToSource { object_key, .. } => object_key,
            SyncAction::Conflict(conflict) => conflict.object_key(),
        }
    }

    /// Direction and entries of a copy; `None` for conflicts.
    pub fn transfer(&self) -> Option<(Direction, &[Entry])> {
        match self {
            SyncAction::CopyToDestination { entries, .. } => {
                Some((Direction::ToDestination, entries.as_slice()))
            }
            SyncAction::CopyToSource { entries, .. } => {
                Some((Direction::ToSource, entries.as_slice()))
            }
            SyncAction::Conflict(_) => None,
        }
    }
}

/// The per-object actions that would bring two stores into agreement,
/// ordered by object key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
}

impl SyncPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the two sides already agree.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of objects with an action.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.actions.iter().filter_map(|action| match action {
            SyncAction::Conflict(conflict) => Some(conflict),
            _ => None,
        })
    }

    /// Number of entries that would be copied in `direction`.
    pub fn entries_to_copy(&self, direction: Direction) -> usize {
        self.actions
            .iter()
            .filter_map(SyncAction::transfer)
            .filter(|(d, _)| *d == direction)
            .map(|(_, entries)| entries.len())
            .sum()
    }
}

/// A copy that could not be applied. Later versions of the same object were
/// not attempted.
#[derive(Debug)]
pub struct TransferFailure {
    pub object_key: String,
    pub version: Version,
    pub direction: Direction,
    pub error: StoreError,
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({}): {}",
            self.object_key, self.version, self.direction, self.error
        )
    }
}

/// Outcome of a sync.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Entries now present on the destination that were copied from the source.
    pub copied_to_destination: Vec<Entry>,
    /// Entries now present on the source that were copied from the destination.
    pub copied_to_source: Vec<Entry>,
    pub conflicts: Vec<Conflict>,
    pub failures: Vec<TransferFailure>,
    /// Objects not attempted because the sync was cancelled.
    pub skipped: Vec<String>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_copy(&mut self, direction: Direction, entry: Entry) {
        match direction {
            Direction::ToDestination => self.copied_to_destination.push(entry),
            Direction::ToSource => self.copied_to_source.push(entry),
        }
    }

    /// Total entries copied in both directions.
    pub fn copied(&self) -> usize {
        self.copied_to_destination.len() + self.copied_to_source.len()
    }

    pub fn status(&self) -> SyncStatus {
        if !self.skipped.is_empty() {
            SyncStatus::Cancelled {
                skipped: self.skipped.len(),
            }
        } else if !self.conflicts.is_empty() || !self.failures.is_empty() {
            SyncStatus::Unresolved {
                conflicts: self.conflicts.len(),
                failures: self.failures.len(),
            }
        } else if self.copied() == 0 {
            SyncStatus::NothingToDo
        } else {
            SyncStatus::Synchronized
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SyncStatus {
    /// Both sides already agreed.
    #[default]
    NothingToDo,
    /// Every planned copy was applied.
    Synchronized,
    Unresolved { conflicts: usize, failures: usize },
    Cancelled { skipped: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> ContentHash {
        ContentHash::from_hash([byte; 32])
    }

    fn copy(key: &str, direction: Direction, versions: &[Version]) -> SyncAction {
        let entries = versions
            .iter()
            .map(|v| Entry::new(key, *v, hash(*v as u8)))
            .collect();
        match direction {
            Direction::ToDestination => SyncAction::CopyToDestination {
                object_key: key.into(),
                entries,
            },
            Direction::ToSource => SyncAction::CopyToSource {
                object_key: key.into(),
                entries,
            },
        }
    }

    #[test]
    fn plan_counts() {
        let plan = SyncPlan {
            actions: vec![
                copy("a", Direction::ToDestination, &[1, 2, 3]),
                copy("b", Direction::ToSource, &[4]),
                SyncAction::Conflict(Conflict::HashMismatch {
                    object_key: "c".into(),
                    version: 2,
                    source_hash: hash(1),
                    destination_hash: hash(2),
                }),
            ],
        };
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.entries_to_copy(Direction::ToDestination), 3);
        assert_eq!(plan.entries_to_copy(Direction::ToSource), 1);
        assert_eq!(plan.conflicts().count(), 1);
        assert_eq!(plan.actions[2].object_key(), "c");
        assert!(plan.actions[2].transfer().is_none());
    }

    #[test]
    fn empty_plan() {
        let plan = SyncPlan::new();
        assert!(plan.is_empty());
        assert_eq!(plan.conflicts().count(), 0);
    }

    #[test]
    fn report_status() {
        let mut report = SyncReport::new();
        assert_eq!(report.status(), SyncStatus::NothingToDo);

        report.record_copy(Direction::ToSource, Entry::new("k", 1, hash(1)));
        assert_eq!(report.status(), SyncStatus::Synchronized);
        assert_eq!(report.copied_to_source.len(), 1);

        report.failures.push(TransferFailure {
            object_key: "x".into(),
            version: 1,
            direction: Direction::ToDestination,
            error: StoreError::ObjectNotFound("x/1".into()),
        });
        assert_eq!(
            report.status(),
            SyncStatus::Unresolved {
                conflicts: 0,
                failures: 1
            }
        );

        report.skipped.push("z".into());
        assert_eq!(report.status(), SyncStatus::Cancelled { skipped: 1 });
    }

    #[test]
    fn conflict_display_names_both_hashes() {
        let conflict = Conflict::HashMismatch {
            object_key: "k".into(),
            version: 2,
            source_hash: hash(0xaa),
            destination_hash: hash(0xbb),
        };
        let text = conflict.to_string();
        assert!(text.starts_with("k@2"));
        assert!(text.contains(&hash(0xaa).short_hex()));
        assert!(text.contains(&hash(0xbb).short_hex()));
    }

    #[test]
    fn plan_serializes_with_tagged_actions() {
        let plan = SyncPlan {
            actions: vec![copy("a", Direction::ToDestination, &[1])],
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["actions"][0]["action"], "copy_to_destination");
        assert_eq!(json["actions"][0]["object_key"], "a");
    }
}
