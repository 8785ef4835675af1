use std::sync::{Arc, Mutex, MutexGuard};

use oss_crypto::ContentHasher;
use oss_perspective::{Perspective, PerspectiveError, PerspectiveView};
use oss_types::{Entry, Version};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::key::{derive_key, validate_object_key, PERSPECTIVE_KEY};
use crate::traits::ObjectStore;

/// A raw object store enriched with a [`Perspective`].
///
/// Payloads are written under `prefix/object_key/version`; the perspective
/// records which versions exist and what each one hashed to, and is
/// persisted under `prefix/Perspective` after every mutation.
///
/// Two locks, both distinct from the perspective's own:
/// - the writer lock serializes this store's mutations, so version
///   assignment, payload write, perspective update and snapshot persist
///   happen as one step;
/// - the sync lock is held by a reconciler for the length of a sync, so two
///   syncs never interleave their plans against the same store.
pub struct VersionedStore {
    raw: Arc<dyn ObjectStore>,
    prefix: String,
    perspective: Perspective,
    writer: Mutex<()>,
    sync: Mutex<()>,
}

impl VersionedStore {
    /// Open a versioned view over `raw` under `prefix`.
    ///
    /// The perspective is loaded from the snapshot key if present, otherwise
    /// it starts empty.
    pub fn open(raw: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> StoreResult<Self> {
        let prefix = prefix.into();
        let snapshot_key = derive_key(&prefix, PERSPECTIVE_KEY, 0);
        let perspective = match raw.get(&snapshot_key) {
            Ok(bytes) => Perspective::from_snapshot(&bytes)?,
            Err(StoreError::ObjectNotFound(_)) => Perspective::new(),
            Err(e) => return Err(e),
        };
        info!(prefix = %prefix, objects = perspective.len(), "versioned store opened");

        Ok(Self {
            raw,
            prefix,
            perspective,
            writer: Mutex::new(()),
            sync: Mutex::new(()),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Read-only access to the version ledger. Versions are only recorded
    /// through this store's writes.
    pub fn perspective(&self) -> PerspectiveView<'_> {
        self.perspective.view()
    }

    /// Raw key of `object_key` at `version` in this store.
    pub fn key(&self, object_key: &str, version: Version) -> String {
        derive_key(&self.prefix, object_key, version)
    }

    fn snapshot_key(&self) -> String {
        derive_key(&self.prefix, PERSPECTIVE_KEY, 0)
    }

    fn lock_writer(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.writer.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Take the sync lock. Held by reconcilers for the duration of a sync.
    pub fn lock_sync(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.sync.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Store `data` as the next version of `object_key` (1 for a new object).
    pub fn put(&self, object_key: &str, data: &[u8]) -> StoreResult<Entry> {
        validate_object_key(object_key)?;
        let _writer = self.lock_writer()?;
        let version = match self.perspective.latest_version(object_key) {
            Ok(latest) => latest
                .checked_add(1)
                .ok_or_else(|| StoreError::VersionOverflow(object_key.to_string()))?,
            Err(PerspectiveError::NoSuchObject(_)) => 1,
            Err(e) => return Err(e.into()),
        };
        let entry = Entry::new(object_key, version, ContentHasher::OBJECT.hash(data));
        self.commit(&entry, data)?;
        Ok(entry)
    }

    /// Store `data` as an explicit version of `object_key`.
    ///
    /// The version must be above the latest recorded one.
    pub fn put_version(
        &self,
        object_key: &str,
        version: Version,
        data: &[u8],
    ) -> StoreResult<Entry> {
        validate_object_key(object_key)?;
        let _writer = self.lock_writer()?;
        let entry = Entry::new(object_key, version, ContentHasher::OBJECT.hash(data));
        self.commit(&entry, data)?;
        Ok(entry)
    }

    /// Record an entry that originated in another store, together with its
    /// payload. The payload must hash to `entry.hash`.
    pub fn put_entry(&self, entry: &Entry, data: &[u8]) -> StoreResult<()> {
        validate_object_key(&entry.object_key)?;
        check_payload(entry, data)?;
        let _writer = self.lock_writer()?;
        self.commit(entry, data)
    }

    /// Write the payload, record the entry, persist the snapshot. Caller
    /// holds the writer lock.
    fn commit(&self, entry: &Entry, data: &[u8]) -> StoreResult<()> {
        // Reject before touching the raw store so an existing version's
        // payload is never overwritten.
        self.perspective.check_update(&entry.object_key, entry.version)?;

        let payload_key = self.key(&entry.object_key, entry.version);
        self.raw.put(&payload_key, data)?;

        if let Err(e) = self
            .perspective
            .update(&entry.object_key, entry.version, entry.hash)
        {
            self.discard_payload(&payload_key);
            return Err(e.into());
        }

        if let Err(e) = self.write_snapshot() {
            self.perspective.retract(&entry.object_key, entry.version);
            self.discard_payload(&payload_key);
            warn!(key = %payload_key, error = %e, "snapshot persist failed; write rolled back");
            return Err(StoreError::Persist {
                key: self.snapshot_key(),
                source: Box::new(e),
            });
        }

        debug!(
            key = %payload_key,
            hash = %entry.hash.short_hex(),
            bytes = data.len(),
            "version stored"
        );
        Ok(())
    }

    fn write_snapshot(&self) -> StoreResult<()> {
        let snapshot = self.perspective.marshal()?;
        self.raw.put(&self.snapshot_key(), &snapshot)
    }

    fn discard_payload(&self, payload_key: &str) {
        if let Err(e) = self.raw.del(payload_key) {
            warn!(key = %payload_key, error = %e, "failed to remove orphaned payload");
        }
    }

    /// Write the current perspective snapshot to the raw store.
    pub fn persist(&self) -> StoreResult<()> {
        let _writer = self.lock_writer()?;
        self.write_snapshot()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The latest version's payload.
    pub fn get(&self, object_key: &str) -> StoreResult<Vec<u8>> {
        let entry = self.perspective.latest(object_key)?;
        self.fetch(&entry)
    }

    /// A specific version's payload. The version must be recorded in the
    /// perspective.
    pub fn get_version(&self, object_key: &str, version: Version) -> StoreResult<Vec<u8>> {
        let entry = self.perspective.entry(object_key, version)?;
        self.fetch(&entry)
    }

    fn fetch(&self, entry: &Entry) -> StoreResult<Vec<u8>> {
        let data = self.raw.get(&self.key(&entry.object_key, entry.version))?;
        check_payload(entry, &data)?;
        Ok(data)
    }

    /// The recorded history of an object, oldest first.
    pub fn history(&self, object_key: &str) -> StoreResult<Vec<Entry>> {
        Ok(self.perspective.history(object_key)?)
    }

    /// Object keys known to this store, sorted.
    pub fn list(&self) -> Vec<String> {
        self.perspective.keys()
    }
}

fn check_payload(entry: &Entry, data: &[u8]) -> StoreResult<()> {
    if ContentHasher::OBJECT.verify(data, &entry.hash) {
        return Ok(());
    }
    Err(StoreError::HashMismatch {
        key: entry.object_key.clone(),
        version: entry.version,
        expected: entry.hash,
        computed: ContentHasher::OBJECT.hash(data),
    })
}

impl std::fmt::Debug for VersionedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedStore")
            .field("prefix", &self.prefix)
            .field("perspective", &self.perspective)
            .finish()
    }
}
