use oss_perspective::PerspectiveError;
use oss_types::{ContentHash, Version};

/// Errors from raw and versioned store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The raw store holds nothing under this key.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The key cannot be stored by this backend.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The key collides with the perspective snapshot.
    #[error("key {0:?} is reserved")]
    ReservedKey(String),

    /// The payload does not match the hash recorded for it.
    #[error("hash mismatch for {key}@{version}: expected {expected}, computed {computed}")]
    HashMismatch {
        key: String,
        version: Version,
        expected: ContentHash,
        computed: ContentHash,
    },

    /// The object's latest version is already the largest representable one.
    #[error("no version after the latest of {0}")]
    VersionOverflow(String),

    /// A version-tracking error from the perspective.
    #[error("perspective error: {0}")]
    Perspective(#[from] PerspectiveError),

    /// The perspective snapshot could not be written; the mutation that
    /// triggered it was rolled back.
    #[error("failed to persist perspective snapshot {key}: {source}")]
    Persist {
        key: String,
        #[source]
        source: Box<StoreError>,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns `true` for failures of the backing storage itself, as opposed
    /// to lookups, validation, or integrity errors.
    pub fn is_io_failure(&self) -> bool {
        match self {
            StoreError::Io(_) => true,
            StoreError::Persist { source, .. } => source.is_io_failure(),
            _ => false,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
