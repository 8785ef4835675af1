use crate::error::StoreResult;

/// Lazy, finite sequence of raw keys produced by [`ObjectStore::list`].
pub type KeyIter<'a> = Box<dyn Iterator<Item = StoreResult<String>> + 'a>;

/// A raw object store: opaque byte blobs addressed by string keys.
///
/// This could be a bucket, a directory, or a map in memory. Implementations
/// must satisfy:
/// - `put` replaces whatever was stored under the key.
/// - `get` and `del` fail with
///   [`StoreError::ObjectNotFound`](crate::StoreError::ObjectNotFound) for
///   absent keys.
/// - Concurrent calls are safe (`Send + Sync`).
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`.
    fn put(&self, key: &str, data: &[u8]) -> StoreResult<()>;

    /// Read the bytes stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Remove `key`.
    fn del(&self, key: &str) -> StoreResult<()>;

    /// Every key currently stored.
    fn list(&self) -> StoreResult<KeyIter<'_>>;
}
