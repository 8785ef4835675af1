//! Content hashing for syncstore.
//!
//! Payload digests are domain-separated BLAKE3 hashes. The hash recorded in
//! a perspective entry is what reconciliation compares to decide whether two
//! replicas hold the same artifact at a given version.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
