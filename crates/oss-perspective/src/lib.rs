//! Perspectives: a replica's record of which versions of which objects it
//! holds.
//!
//! A [`Perspective`] maps an object key to the ordered history of
//! `(version, content hash)` facts that replica has recorded. It is the
//! single source of truth for "what versions exist" on one side of a sync;
//! the reconciler compares two perspectives to plan a synchronization.
//!
//! # Rules
//!
//! 1. Versions start at 1 and strictly increase within one history.
//!    Non-increasing updates are rejected, never applied.
//! 2. An object without entries is absent; there are no empty histories.
//! 3. Every operation is mutually exclusive at whole-perspective
//!    granularity (one `RwLock` per instance).
//! 4. Iterators are weakly consistent: they take the read lock once per
//!    element and never hand out a partially written entry.
//!
//! # Modules
//!
//! - [`perspective`]: the [`Perspective`] ledger
//! - [`iter`]: [`LatestIter`] and [`HistoryIter`]
//! - [`snapshot`]: the JSON snapshot format used by `marshal`/`unmarshal`
//! - [`view`]: [`PerspectiveView`], a read-only handle
//! - [`error`]: [`PerspectiveError`]

pub mod error;
pub mod iter;
pub mod perspective;
pub mod snapshot;
pub mod view;

pub use error::{PerspectiveError, PerspectiveResult};
pub use iter::{HistoryIter, LatestIter};
pub use perspective::Perspective;
pub use snapshot::SNAPSHOT_FORMAT;
pub use view::PerspectiveView;
