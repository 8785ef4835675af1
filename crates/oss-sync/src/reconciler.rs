use std::sync::{Arc, MutexGuard};

use oss_store::{StoreResult, VersionedStore};
use oss_types::Entry;
use tracing::{debug, info, warn};

use crate::cancel::Cancellation;
use crate::error::{SyncError, SyncResult};
use crate::plan::diff;
use crate::types::{Direction, SyncAction, SyncPlan, SyncReport, SyncStatus, TransferFailure};

/// Reconciles two versioned stores.
///
/// "Source" and "destination" only name the two sides; copies flow both
/// ways. A sync holds both stores' sync locks for its whole run, taken in a
/// fixed order, so concurrent syncs over overlapping pairs serialize instead
/// of deadlocking.
pub struct Reconciler {
    source: Arc<VersionedStore>,
    destination: Arc<VersionedStore>,
}

impl Reconciler {
    pub fn new(source: Arc<VersionedStore>, destination: Arc<VersionedStore>) -> SyncResult<Self> {
        if Arc::ptr_eq(&source, &destination) {
            return Err(SyncError::SameStore);
        }
        Ok(Self {
            source,
            destination,
        })
    }

    pub fn source(&self) -> &Arc<VersionedStore> {
        &self.source
    }

    pub fn destination(&self) -> &Arc<VersionedStore> {
        &self.destination
    }

    /// The current plan, without applying anything.
    pub fn plan(&self) -> SyncPlan {
        diff(self.source.perspective(), self.destination.perspective())
    }

    /// Run a sync to completion.
    pub fn sync(&self) -> SyncResult<SyncReport> {
        self.sync_with(&Cancellation::new())
    }

    /// Run a sync, checking `cancel` before each object's copies.
    ///
    /// Returns the report on full success. Conflicts or failed transfers give
    /// [`SyncError::Unresolved`]; cancellation gives [`SyncError::Cancelled`].
    /// Both carry the report, and copies already applied are kept.
    pub fn sync_with(&self, cancel: &Cancellation) -> SyncResult<SyncReport> {
        let _guards = self.lock_both()?;

        let plan = self.plan();
        info!(
            source = self.source.prefix(),
            destination = self.destination.prefix(),
            objects = plan.len(),
            to_destination = plan.entries_to_copy(Direction::ToDestination),
            to_source = plan.entries_to_copy(Direction::ToSource),
            conflicts = plan.conflicts().count(),
            "sync plan computed"
        );

        let mut report = SyncReport::new();
        for action in plan.actions {
            let (direction, object_key, entries) = match action {
                SyncAction::Conflict(conflict) => {
                    warn!(%conflict, "conflict left unresolved");
                    report.conflicts.push(conflict);
                    continue;
                }
                SyncAction::CopyToDestination {
                    object_key,
                    entries,
                } => (Direction::ToDestination, object_key, entries),
                SyncAction::CopyToSource {
                    object_key,
                    entries,
                } => (Direction::ToSource, object_key, entries),
            };
            if cancel.is_cancelled() {
                report.skipped.push(object_key);
                continue;
            }
            self.apply(direction, &object_key, entries, &mut report);
        }

        let status = report.status();
        info!(
            copied = report.copied(),
            conflicts = report.conflicts.len(),
            failures = report.failures.len(),
            skipped = report.skipped.len(),
            "sync finished"
        );
        match status {
            SyncStatus::NothingToDo | SyncStatus::Synchronized => Ok(report),
            SyncStatus::Unresolved { .. } => Err(SyncError::Unresolved(Box::new(report))),
            SyncStatus::Cancelled { .. } => Err(SyncError::Cancelled(Box::new(report))),
        }
    }

    /// Copy one object's entries oldest first. The first failure stops this
    /// object; later versions would land on top of a gap.
    fn apply(
        &self,
        direction: Direction,
        object_key: &str,
        entries: Vec<Entry>,
        report: &mut SyncReport,
    ) {
        let (from, to) = match direction {
            Direction::ToDestination => (&self.source, &self.destination),
            Direction::ToSource => (&self.destination, &self.source),
        };
        for entry in entries {
            match copy_entry(from, to, &entry) {
                Ok(()) => {
                    debug!(%entry, %direction, "entry copied");
                    report.record_copy(direction, entry);
                }
                Err(error) => {
                    warn!(%entry, %direction, %error, "transfer failed");
                    report.failures.push(TransferFailure {
                        object_key: object_key.to_string(),
                        version: entry.version,
                        direction,
                        error,
                    });
                    return;
                }
            }
        }
    }

    fn lock_both(&self) -> StoreResult<(MutexGuard<'_, ()>, MutexGuard<'_, ()>)> {
        let source_first = Arc::as_ptr(&self.source) < Arc::as_ptr(&self.destination);
        if source_first {
            let first = self.source.lock_sync()?;
            let second = self.destination.lock_sync()?;
            Ok((first, second))
        } else {
            let first = self.destination.lock_sync()?;
            let second = self.source.lock_sync()?;
            Ok((first, second))
        }
    }
}

fn copy_entry(from: &VersionedStore, to: &VersionedStore, entry: &Entry) -> StoreResult<()> {
    let data = from.get_version(&entry.object_key, entry.version)?;
    to.put_entry(entry, &data)
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("source", &self.source.prefix())
            .field("destination", &self.destination.prefix())
            .finish()
    }
}
