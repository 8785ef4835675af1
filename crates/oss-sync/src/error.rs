use thiserror::Error;

use crate::types::SyncReport;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot sync a store with itself")]
    SameStore,

    #[error("store error: {0}")]
    Store(#[from] oss_store::StoreError),

    /// The sync ran to the end but left conflicts or failed transfers.
    /// Copies that succeeded stay applied.
    #[error(
        "sync left {} conflict(s) and {} failed transfer(s) unresolved",
        .0.conflicts.len(),
        .0.failures.len()
    )]
    Unresolved(Box<SyncReport>),

    /// The sync stopped early; objects not yet attempted are listed in the
    /// report.
    #[error("sync cancelled with {} object(s) not attempted", .0.skipped.len())]
    Cancelled(Box<SyncReport>),
}

impl SyncError {
    /// The partial report carried by `Unresolved` and `Cancelled`.
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncError::Unresolved(report) | SyncError::Cancelled(report) => Some(report),
            _ => None,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
