use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::{KeyIter, ObjectStore};

/// In-memory, map-based raw object store.
///
/// Intended for tests and embedding. Blobs are held behind a `RwLock` and
/// copied on read and write.
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Sorted list of all keys.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        let mut map = self.objects.write().map_err(|_| StoreError::LockPoisoned)?;
        map.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let map = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
        map.get(key)
            .cloned()
            .ok_or_else(|| StoreError::ObjectNotFound(key.to_string()))
    }

    fn del(&self, key: &str) -> StoreResult<()> {
        let mut map = self.objects.write().map_err(|_| StoreError::LockPoisoned)?;
        map.remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::ObjectNotFound(key.to_string()))
    }

    fn list(&self) -> StoreResult<KeyIter<'_>> {
        let map = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
        let keys: Vec<String> = map.keys().cloned().collect();
        Ok(Box::new(keys.into_iter().map(Ok)))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}
