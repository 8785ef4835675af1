//! Foundation types for syncstore.
//!
//! Every other syncstore crate depends on `oss-types`.
//!
//! # Key Types
//!
//! - [`ContentHash`]: 32-byte digest identifying the bytes of one object version
//! - [`Version`]: per-object version number; valid versions start at 1
//! - [`Entry`]: one historical fact about an object: key, version, hash

pub mod entry;
pub mod error;
pub mod hash;

pub use entry::{Entry, Version};
pub use error::TypeError;
pub use hash::ContentHash;
