use std::collections::BTreeMap;

use oss_types::{Entry, Version};

use crate::error::PerspectiveResult;
use crate::iter::{HistoryIter, LatestIter};
use crate::perspective::Perspective;

/// Read-only handle to a [`Perspective`].
///
/// Handed out by owners that must stay the only writer, such as a versioned
/// store whose payloads and snapshot follow every update.
#[derive(Clone, Copy)]
pub struct PerspectiveView<'a> {
    inner: &'a Perspective,
}

impl<'a> PerspectiveView<'a> {
    pub(crate) fn new(inner: &'a Perspective) -> Self {
        Self { inner }
    }

    pub fn latest_version(&self, object_key: &str) -> PerspectiveResult<Version> {
        self.inner.latest_version(object_key)
    }

    pub fn latest(&self, object_key: &str) -> PerspectiveResult<Entry> {
        self.inner.latest(object_key)
    }

    pub fn entry(&self, object_key: &str, version: Version) -> PerspectiveResult<Entry> {
        self.inner.entry(object_key, version)
    }

    pub fn history(&self, object_key: &str) -> PerspectiveResult<Vec<Entry>> {
        self.inner.history(object_key)
    }

    pub fn histories(&self) -> BTreeMap<String, Vec<Entry>> {
        self.inner.histories()
    }

    pub fn contains(&self, object_key: &str) -> bool {
        self.inner.contains(object_key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn marshal(&self) -> PerspectiveResult<Vec<u8>> {
        self.inner.marshal()
    }

    pub fn iter_latest(&self) -> LatestIter<'a> {
        self.inner.iter_latest()
    }

    pub fn iter_history(&self, object_key: &str) -> HistoryIter<'a> {
        self.inner.iter_history(object_key)
    }
}

impl std::fmt::Debug for PerspectiveView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PerspectiveView").field(self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use oss_types::ContentHash;

    use super::*;

    #[test]
    fn view_reads_through_to_the_perspective() {
        let p = Perspective::new();
        p.update("k", 1, ContentHash::from_hash([1; 32])).unwrap();
        let view = p.view();
        p.update("k", 2, ContentHash::from_hash([2; 32])).unwrap();

        assert_eq!(view.latest_version("k").unwrap(), 2);
        assert_eq!(view.history("k").unwrap().len(), 2);
        assert_eq!(view.keys(), vec!["k"]);
        assert_eq!(view.iter_latest().count(), 1);
        assert_eq!(view.marshal().unwrap(), p.marshal().unwrap());
    }
}
