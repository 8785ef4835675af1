//! Two-way synchronization between versioned stores.
//!
//! [`diff`] compares two perspectives object by object and produces a
//! [`SyncPlan`]: copies of missing history tails in either direction, and
//! [`Conflict`]s where both sides recorded different content under the same
//! version. A [`Reconciler`] computes that plan for a pair of
//! [`VersionedStore`](oss_store::VersionedStore)s and applies it.
//!
//! Conflicts are reported, never resolved. A sync is best-effort: every
//! copy that can be applied is applied, and conflicts and failed transfers
//! come back together in a [`SyncReport`].

pub mod cancel;
pub mod error;
pub mod plan;
pub mod reconciler;
pub mod types;

pub use cancel::Cancellation;
pub use error::{SyncError, SyncResult};
pub use plan::{diff, diff_histories, diff_object};
pub use reconciler::Reconciler;
pub use types::{
    Conflict, Direction, SyncAction, SyncPlan, SyncReport, SyncStatus, TransferFailure,
};
