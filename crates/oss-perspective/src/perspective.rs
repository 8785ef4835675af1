use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use oss_types::{ContentHash, Entry, Version};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PerspectiveError, PerspectiveResult};
use crate::iter::{HistoryIter, LatestIter};
use crate::snapshot;
use crate::view::PerspectiveView;

/// One `(version, hash)` fact without its key; histories are stored as
/// vectors of these under the object key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Revision {
    pub version: Version,
    pub hash: ContentHash,
}

impl Revision {
    pub(crate) fn to_entry(self, object_key: &str) -> Entry {
        Entry::new(object_key, self.version, self.hash)
    }
}

/// Object key to its history, oldest first. Never holds an empty history.
pub(crate) type ObjectMap = BTreeMap<String, Vec<Revision>>;

/// A replica's ledger of object versions.
///
/// Owned by exactly one versioned store. All reads and writes take the same
/// `RwLock`; histories are short and updates rare next to reconciliation
/// reads, so whole-perspective locking is enough.
pub struct Perspective {
    objects: RwLock<ObjectMap>,
}

impl Perspective {
    /// Create an empty perspective.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(ObjectMap::new()),
        }
    }

    /// Build a perspective from bytes produced by [`Perspective::marshal`].
    pub fn from_snapshot(bytes: &[u8]) -> PerspectiveResult<Self> {
        let objects = snapshot::decode(bytes)?;
        Ok(Self {
            objects: RwLock::new(objects),
        })
    }

    // Critical sections never leave the map half-updated, so a poisoned lock
    // is still safe to use.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ObjectMap> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ObjectMap> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether [`Perspective::update`] would accept `version` right now,
    /// without recording anything.
    pub fn check_update(&self, object_key: &str, version: Version) -> PerspectiveResult<()> {
        let objects = self.read();
        admit(&objects, object_key, version)
    }

    /// Append a version to an object's history.
    ///
    /// Fails with [`PerspectiveError::InvalidVersion`] for `version <= 0` and
    /// with [`PerspectiveError::VersionRollback`] if `version` does not exceed
    /// the latest recorded version. Nothing changes on failure.
    pub fn update(
        &self,
        object_key: &str,
        version: Version,
        hash: ContentHash,
    ) -> PerspectiveResult<()> {
        let mut objects = self.write();
        admit(&objects, object_key, version)?;
        objects
            .entry(object_key.to_string())
            .or_default()
            .push(Revision { version, hash });
        drop(objects);

        debug!(object = object_key, version, hash = %hash.short_hex(), "perspective updated");
        Ok(())
    }

    /// Remove the latest entry of `object_key` if it is exactly `version`.
    ///
    /// Returns `true` if an entry was removed. Used to undo an update whose
    /// surrounding write could not be completed.
    pub fn retract(&self, object_key: &str, version: Version) -> bool {
        let mut objects = self.write();
        let Some(history) = objects.get_mut(object_key) else {
            return false;
        };
        if history.last().map(|r| r.version) != Some(version) {
            return false;
        }
        history.pop();
        if history.is_empty() {
            objects.remove(object_key);
        }
        drop(objects);

        debug!(object = object_key, version, "perspective entry retracted");
        true
    }

    /// The latest recorded version of an object.
    pub fn latest_version(&self, object_key: &str) -> PerspectiveResult<Version> {
        self.latest(object_key).map(|entry| entry.version)
    }

    /// The latest recorded entry of an object.
    pub fn latest(&self, object_key: &str) -> PerspectiveResult<Entry> {
        let objects = self.read();
        objects
            .get(object_key)
            .and_then(|history| history.last())
            .map(|revision| revision.to_entry(object_key))
            .ok_or_else(|| PerspectiveError::NoSuchObject(object_key.to_string()))
    }

    /// The entry recorded for a specific version of an object.
    pub fn entry(&self, object_key: &str, version: Version) -> PerspectiveResult<Entry> {
        let objects = self.read();
        let history = objects
            .get(object_key)
            .ok_or_else(|| PerspectiveError::NoSuchObject(object_key.to_string()))?;
        history
            .binary_search_by_key(&version, |r| r.version)
            .map(|index| history[index].to_entry(object_key))
            .map_err(|_| PerspectiveError::NoSuchVersion {
                object_key: object_key.to_string(),
                version,
            })
    }

    /// The full history of an object, oldest first.
    pub fn history(&self, object_key: &str) -> PerspectiveResult<Vec<Entry>> {
        let objects = self.read();
        let history = objects
            .get(object_key)
            .ok_or_else(|| PerspectiveError::NoSuchObject(object_key.to_string()))?;
        Ok(history.iter().map(|r| r.to_entry(object_key)).collect())
    }

    /// Every history, taken under a single lock acquisition.
    pub fn histories(&self) -> BTreeMap<String, Vec<Entry>> {
        let objects = self.read();
        objects
            .iter()
            .map(|(key, history)| {
                let entries = history.iter().map(|r| r.to_entry(key)).collect();
                (key.clone(), entries)
            })
            .collect()
    }

    /// Returns `true` if the object has at least one recorded version.
    pub fn contains(&self, object_key: &str) -> bool {
        self.read().contains_key(object_key)
    }

    /// All known object keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Number of known objects.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if no object has been recorded.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Serialize the whole perspective.
    pub fn marshal(&self) -> PerspectiveResult<Vec<u8>> {
        let objects = self.read();
        snapshot::encode(&objects)
    }

    /// Replace the contents of this perspective with a serialized snapshot.
    ///
    /// The snapshot is fully decoded and validated before the swap; an
    /// invalid snapshot leaves the perspective untouched.
    pub fn unmarshal(&self, bytes: &[u8]) -> PerspectiveResult<()> {
        let decoded = snapshot::decode(bytes)?;
        let count = decoded.len();
        *self.write() = decoded;
        debug!(objects = count, "perspective restored from snapshot");
        Ok(())
    }

    /// A read-only handle to this perspective.
    pub fn view(&self) -> PerspectiveView<'_> {
        PerspectiveView::new(self)
    }

    /// Iterate over the latest entry of every object, in key order.
    pub fn iter_latest(&self) -> LatestIter<'_> {
        LatestIter::new(self)
    }

    /// Iterate over one object's history, oldest first.
    ///
    /// Yields nothing for an unknown object.
    pub fn iter_history(&self, object_key: &str) -> HistoryIter<'_> {
        HistoryIter::new(self, object_key)
    }
}

fn admit(objects: &ObjectMap, object_key: &str, version: Version) -> PerspectiveResult<()> {
    if version <= 0 {
        return Err(PerspectiveError::InvalidVersion {
            object_key: object_key.to_string(),
            version,
        });
    }
    if let Some(latest) = objects.get(object_key).and_then(|history| history.last()) {
        if version <= latest.version {
            return Err(PerspectiveError::VersionRollback {
                object_key: object_key.to_string(),
                version,
                latest: latest.version,
            });
        }
    }
    Ok(())
}

impl Default for Perspective {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Perspective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Perspective")
            .field("objects", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    fn hash(seed: u8) -> ContentHash {
        ContentHash::from_hash([seed; 32])
    }

    // -----------------------------------------------------------------------
    // Update / latest version
    // -----------------------------------------------------------------------

    #[test]
    fn update_and_latest_version() {
        let p = Perspective::new();
        p.update("obj1", 1, hash(1)).unwrap();
        p.update("obj1", 2, hash(2)).unwrap();
        assert_eq!(p.latest_version("obj1").unwrap(), 2);
        assert_eq!(p.latest("obj1").unwrap(), Entry::new("obj1", 2, hash(2)));
    }

    #[test]
    fn unknown_object_is_no_such_object() {
        let p = Perspective::new();
        assert_eq!(
            p.latest_version("objN"),
            Err(PerspectiveError::NoSuchObject("objN".into()))
        );
        assert!(p.history("objN").is_err());
    }

    #[test]
    fn non_positive_versions_are_rejected_without_change() {
        let p = Perspective::new();
        p.update("obj1", 1, hash(1)).unwrap();
        for bad in [0, -1] {
            let err = p.update("obj1", bad, hash(9)).unwrap_err();
            assert!(matches!(
                err,
                PerspectiveError::InvalidVersion { version, .. } if version == bad
            ));
        }
        assert!(matches!(
            p.update("fresh", 0, hash(9)),
            Err(PerspectiveError::InvalidVersion { .. })
        ));
        assert!(!p.contains("fresh"));
        assert_eq!(p.history("obj1").unwrap().len(), 1);
    }

    #[test]
    fn rollback_is_rejected() {
        let p = Perspective::new();
        p.update("k", 3, hash(3)).unwrap();
        let err = p.update("k", 3, hash(4)).unwrap_err();
        assert_eq!(
            err,
            PerspectiveError::VersionRollback {
                object_key: "k".into(),
                version: 3,
                latest: 3
            }
        );
        assert!(p.update("k", 2, hash(2)).is_err());
        assert_eq!(p.latest("k").unwrap().hash, hash(3));
    }

    #[test]
    fn check_update_matches_update_without_recording() {
        let p = Perspective::new();
        p.check_update("k", 1).unwrap();
        assert!(!p.contains("k"));
        p.update("k", 1, hash(1)).unwrap();
        assert!(matches!(
            p.check_update("k", 1),
            Err(PerspectiveError::VersionRollback { latest: 1, .. })
        ));
        assert!(matches!(
            p.check_update("k", -3),
            Err(PerspectiveError::InvalidVersion { .. })
        ));
        p.check_update("k", 2).unwrap();
    }

    #[test]
    fn gaps_are_allowed() {
        let p = Perspective::new();
        p.update("k", 1, hash(1)).unwrap();
        p.update("k", 5, hash(5)).unwrap();
        let versions: Vec<_> = p.history("k").unwrap().iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 5]);
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    #[test]
    fn entry_by_version() {
        let p = Perspective::new();
        p.update("k", 1, hash(1)).unwrap();
        p.update("k", 4, hash(4)).unwrap();
        assert_eq!(p.entry("k", 4).unwrap().hash, hash(4));
        assert_eq!(
            p.entry("k", 2),
            Err(PerspectiveError::NoSuchVersion {
                object_key: "k".into(),
                version: 2
            })
        );
        assert!(matches!(p.entry("x", 1), Err(PerspectiveError::NoSuchObject(_))));
    }

    #[test]
    fn keys_len_and_histories() {
        let p = Perspective::new();
        assert!(p.is_empty());
        p.update("b", 1, hash(1)).unwrap();
        p.update("a", 1, hash(2)).unwrap();
        p.update("a", 2, hash(3)).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.keys(), vec!["a".to_string(), "b".to_string()]);

        let all = p.histories();
        assert_eq!(all["a"].len(), 2);
        assert_eq!(all["b"], vec![Entry::new("b", 1, hash(1))]);
    }

    // -----------------------------------------------------------------------
    // Retract
    // -----------------------------------------------------------------------

    #[test]
    fn retract_only_removes_matching_latest() {
        let p = Perspective::new();
        p.update("k", 1, hash(1)).unwrap();
        p.update("k", 2, hash(2)).unwrap();
        assert!(!p.retract("k", 1));
        assert!(p.retract("k", 2));
        assert_eq!(p.latest_version("k").unwrap(), 1);
        assert!(!p.retract("missing", 1));
    }

    #[test]
    fn retract_last_entry_removes_object() {
        let p = Perspective::new();
        p.update("k", 1, hash(1)).unwrap();
        assert!(p.retract("k", 1));
        assert!(!p.contains("k"));
        assert!(p.is_empty());
    }

    // -----------------------------------------------------------------------
    // Marshal / unmarshal
    // -----------------------------------------------------------------------

    #[test]
    fn marshal_roundtrip_preserves_histories() {
        let p = Perspective::new();
        p.update("k1", 1, hash(1)).unwrap();
        p.update("k1", 2, hash(2)).unwrap();
        p.update("k2", 7, hash(7)).unwrap();

        let restored = Perspective::new();
        restored.unmarshal(&p.marshal().unwrap()).unwrap();
        assert_eq!(restored.histories(), p.histories());
        assert_eq!(restored.latest_version("k1").unwrap(), 2);
        assert_eq!(restored.latest_version("k2").unwrap(), 7);
    }

    #[test]
    fn unmarshal_replaces_contents() {
        let source = Perspective::new();
        source.update("new", 1, hash(1)).unwrap();

        let target = Perspective::new();
        target.update("old", 1, hash(2)).unwrap();
        target.unmarshal(&source.marshal().unwrap()).unwrap();
        assert_eq!(target.keys(), vec!["new".to_string()]);
    }

    #[test]
    fn failed_unmarshal_leaves_state() {
        let p = Perspective::new();
        p.update("k", 1, hash(1)).unwrap();
        assert!(p.unmarshal(b"not json").is_err());
        assert_eq!(p.latest_version("k").unwrap(), 1);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_updates_on_distinct_keys_are_not_lost() {
        let p = Arc::new(Perspective::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let p = Arc::clone(&p);
                thread::spawn(move || {
                    let key = format!("obj-{t}");
                    for v in 1..=100 {
                        p.update(&key, v, hash(v as u8)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        assert_eq!(p.len(), 8);
        for t in 0..8 {
            let key = format!("obj-{t}");
            assert_eq!(p.latest_version(&key).unwrap(), 100);
            assert_eq!(p.history(&key).unwrap().len(), 100);
        }
    }

    #[test]
    fn concurrent_updates_on_one_key_stay_monotonic() {
        let p = Arc::new(Perspective::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || {
                    for v in 1..=50 {
                        // Losers of each race get VersionRollback.
                        let _ = p.update("shared", v, hash(v as u8));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        let versions: Vec<_> = p.history("shared").unwrap().iter().map(|e| e.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(versions.last(), Some(&50));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn latest_version_is_last_applied(steps in proptest::collection::vec(1i64..5, 1..30)) {
            let p = Perspective::new();
            let mut version = 0;
            for (i, step) in steps.iter().enumerate() {
                version += step;
                p.update("k", version, hash(i as u8)).unwrap();
            }
            prop_assert_eq!(p.latest_version("k").unwrap(), version);
            prop_assert_eq!(p.history("k").unwrap().len(), steps.len());
        }

        #[test]
        fn rejected_versions_never_change_state(bad in -100i64..=0) {
            let p = Perspective::new();
            p.update("k", 1, hash(1)).unwrap();
            prop_assert!(p.update("k", bad, hash(2)).is_err());
            prop_assert_eq!(p.history("k").unwrap(), vec![Entry::new("k", 1, hash(1))]);
        }
    }
}
