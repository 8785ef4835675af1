//! Object storage for syncstore.
//!
//! Two layers live here:
//!
//! - **Raw object stores** ([`ObjectStore`]) hold opaque byte blobs under
//!   string keys. They know nothing about versions.
//! - The **versioned store** ([`VersionedStore`]) composes one raw store
//!   with a [`Perspective`](oss_perspective::Perspective): every put picks
//!   the next version, writes the payload under a versioned key, records
//!   the version and content hash, and persists the perspective snapshot.
//!
//! # Storage Backends
//!
//! - [`InMemoryObjectStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- one file per key under a root directory
//!
//! # Key Layout
//!
//! Raw keys are derived by [`derive_key`]:
//! `[prefix "/"] object_key ["/" version]`. The perspective snapshot lives
//! unversioned under [`PERSPECTIVE_KEY`].
//!
//! # Design Rules
//!
//! 1. The perspective is the sole authority for which versions exist; the
//!    raw store is only ever addressed through derived keys.
//! 2. Write-then-record: payload first, then the perspective, then the
//!    snapshot. A failed snapshot write undoes the other two.
//! 3. Reads verify the payload against the recorded content hash.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod key;
pub mod memory;
pub mod traits;
pub mod versioned;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use key::{derive_key, validate_object_key, PERSPECTIVE_KEY};
pub use memory::InMemoryObjectStore;
pub use traits::{KeyIter, ObjectStore};
pub use versioned::VersionedStore;
