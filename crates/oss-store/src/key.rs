//! Raw key derivation and object-key validation.

use oss_types::Version;

use crate::error::{StoreError, StoreResult};

/// Object key under which a versioned store keeps its perspective snapshot.
pub const PERSPECTIVE_KEY: &str = "Perspective";

/// Compose the raw store key for `base` at `version`.
///
/// `[prefix + "/"] + base [+ "/" + version]`: the prefix segment is omitted
/// when empty, the version segment when `version <= 0`. Other replicas
/// derive keys the same way, so this layout must not change.
pub fn derive_key(prefix: &str, base: &str, version: Version) -> String {
    let mut key = String::with_capacity(prefix.len() + base.len() + 12);
    if !prefix.is_empty() {
        key.push_str(prefix);
        key.push('/');
    }
    key.push_str(base);
    if version > 0 {
        key.push('/');
        key.push_str(&version.to_string());
    }
    key
}

/// Check that `key` is usable as an object key in a versioned store.
///
/// Object keys must be non-empty, must not start with the reserved snapshot
/// key as their first segment, and must not contain empty, `.` or `..` path
/// segments. A key nested under the snapshot key would place payloads where
/// the snapshot itself is stored.
pub fn validate_object_key(key: &str) -> StoreResult<()> {
    if key.split('/').next() == Some(PERSPECTIVE_KEY) {
        return Err(StoreError::ReservedKey(key.to_string()));
    }
    check_segments(key).map_err(|reason| StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

pub(crate) fn check_segments(key: &str) -> Result<(), &'static str> {
    if key.is_empty() {
        return Err("key is empty");
    }
    for segment in key.split('/') {
        match segment {
            "" => return Err("empty path segment"),
            "." | ".." => return Err("relative path segment"),
            _ => {}
        }
    }
    Ok(())
}
