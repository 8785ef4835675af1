use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// Per-object version number.
///
/// Signed so that callers handing in `0` or negative numbers get a typed
/// rejection instead of a wrap-around. Valid versions start at 1.
pub type Version = i64;

/// A single historical fact about one object: at `version`, the object's
/// payload hashed to `hash`.
///
/// Entries are immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub object_key: String,
    pub version: Version,
    pub hash: ContentHash,
}

impl Entry {
    pub fn new(object_key: impl Into<String>, version: Version, hash: ContentHash) -> Self {
        Self {
            object_key: object_key.into(),
            version,
            hash,
        }
    }

    /// Returns `true` if both entries record the same version with the same hash.
    pub fn same_revision(&self, other: &Entry) -> bool {
        self.version == other.version && self.hash == other.hash
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.object_key, self.version, self.hash.short_hex())
    }
}
