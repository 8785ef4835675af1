//! Filesystem-backed raw object store.
//!
//! Each key maps to one file under the root directory; every `/`-separated
//! key segment but the last becomes a directory level, and the last becomes
//! a file named `<segment>.blob`. Since no key segment may end in `.blob`,
//! `a` and `a/1` can both be stored: `a.blob` is a file and `a/` a
//! directory. Writes land in a temporary file next to the target and are
//! renamed into place, so readers never see a partially written blob.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::key::check_segments;
use crate::traits::{KeyIter, ObjectStore};

/// Name prefix of in-flight temporary files; never listed as keys.
const TEMP_PREFIX: &str = ".oss-tmp";

/// Suffix of every blob file. Directories never carry it.
const BLOB_SUFFIX: &str = ".blob";

/// Raw object store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "filesystem object store opened");
        Ok(Self { root })
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let invalid = |reason: &str| StoreError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        check_segments(key).map_err(invalid)?;
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.starts_with(TEMP_PREFIX) {
                return Err(invalid("segment uses the temporary file prefix"));
            }
            if segment.ends_with(BLOB_SUFFIX) {
                return Err(invalid("segment uses the blob file suffix"));
            }
            path.push(segment);
        }
        let mut file_name = path.file_name().unwrap_or_default().to_os_string();
        file_name.push(BLOB_SUFFIX);
        path.set_file_name(file_name);
        Ok(path)
    }
}

fn not_found(key: &str, err: io::Error) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::ObjectNotFound(key.to_string())
    } else {
        StoreError::Io(err)
    }
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let key = segments.join("/");
    key.strip_suffix(BLOB_SUFFIX).map(str::to_string)
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(parent)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| not_found(key, e))
    }

    fn del(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        fs::remove_file(&path).map_err(|e| not_found(key, e))
    }

    fn list(&self) -> StoreResult<KeyIter<'_>> {
        let root = self.root.as_path();
        let walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
        let keys = walker.into_iter().filter_map(move |entry| match entry {
            Ok(entry) => {
                let name = entry.file_name().to_string_lossy();
                if !entry.file_type().is_file()
                    || name.starts_with(TEMP_PREFIX)
                    || !name.ends_with(BLOB_SUFFIX)
                {
                    return None;
                }
                relative_key(root, entry.path()).map(Ok)
            }
            Err(err) => Some(Err(StoreError::Io(err.into()))),
        });
        Ok(Box::new(keys))
    }
}
