//! Weakly consistent iteration over a [`Perspective`].
//!
//! Both iterators take the perspective's read lock once per element, copy a
//! whole [`Entry`] out, and release the lock before yielding it. A slow
//! consumer therefore never blocks writers, and every yielded entry is one
//! that was recorded in full. Updates made while an iteration is in flight
//! may or may not be observed.

use std::ops::Bound;

use oss_types::Entry;

use crate::perspective::Perspective;

/// Yields the latest entry of every object, in key order.
///
/// The iterator remembers the last key it yielded and resumes strictly after
/// it, so objects added behind the cursor are skipped and objects added
/// ahead of it are seen.
pub struct LatestIter<'a> {
    perspective: &'a Perspective,
    cursor: Option<String>,
}

impl<'a> LatestIter<'a> {
    pub(crate) fn new(perspective: &'a Perspective) -> Self {
        Self {
            perspective,
            cursor: None,
        }
    }
}

impl Iterator for LatestIter<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        let objects = self.perspective.read();
        let next = match self.cursor.as_deref() {
            None => objects.iter().next(),
            Some(last) => objects
                .range::<str, _>((Bound::Excluded(last), Bound::Unbounded))
                .next(),
        };
        let (key, history) = next?;
        let entry = history.last()?.to_entry(key);
        drop(objects);

        self.cursor = Some(entry.object_key.clone());
        Some(entry)
    }
}

/// Yields one object's history, oldest first.
pub struct HistoryIter<'a> {
    perspective: &'a Perspective,
    object_key: String,
    index: usize,
}

impl<'a> HistoryIter<'a> {
    pub(crate) fn new(perspective: &'a Perspective, object_key: &str) -> Self {
        Self {
            perspective,
            object_key: object_key.to_string(),
            index: 0,
        }
    }
}

impl Iterator for HistoryIter<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        let objects = self.perspective.read();
        let revision = *objects.get(&self.object_key)?.get(self.index)?;
        drop(objects);

        self.index += 1;
        Some(revision.to_entry(&self.object_key))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use oss_types::ContentHash;

    use super::*;

    fn hash(seed: u8) -> ContentHash {
        ContentHash::from_hash([seed; 32])
    }

    fn sample() -> Perspective {
        let p = Perspective::new();
        p.update("b", 1, hash(1)).unwrap();
        p.update("a", 1, hash(2)).unwrap();
        p.update("a", 2, hash(3)).unwrap();
        p.update("c", 9, hash(4)).unwrap();
        p
    }

    #[test]
    fn latest_yields_one_entry_per_object_in_key_order() {
        let p = sample();
        let latest: Vec<Entry> = p.iter_latest().collect();
        assert_eq!(
            latest,
            vec![
                Entry::new("a", 2, hash(3)),
                Entry::new("b", 1, hash(1)),
                Entry::new("c", 9, hash(4)),
            ]
        );
    }

    #[test]
    fn latest_on_empty_perspective() {
        let p = Perspective::new();
        assert_eq!(p.iter_latest().count(), 0);
    }

    #[test]
    fn history_is_oldest_first() {
        let p = sample();
        let versions: Vec<_> = p.iter_history("a").map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 2]);
        assert_eq!(p.iter_history("missing").count(), 0);
    }

    #[test]
    fn iterators_are_finite_and_not_restartable() {
        let p = sample();
        let mut it = p.iter_latest();
        assert_eq!(it.by_ref().count(), 3);
        assert!(it.next().is_none());
    }

    #[test]
    fn iteration_does_not_block_writers() {
        let p = sample();
        let mut it = p.iter_latest();
        let first = it.next().unwrap();
        assert_eq!(first.object_key, "a");

        // Holding an iterator mid-way must not hold the lock.
        p.update("a", 3, hash(5)).unwrap();
        p.update("d", 1, hash(6)).unwrap();
        p.update("0", 1, hash(7)).unwrap();

        let rest: Vec<_> = it.map(|e| e.object_key).collect();
        assert_eq!(rest, vec!["b", "c", "d"]);
    }

    #[test]
    fn history_observes_appends_made_during_iteration() {
        let p = sample();
        let mut it = p.iter_history("a");
        assert_eq!(it.next().unwrap().version, 1);
        p.update("a", 3, hash(8)).unwrap();
        let rest: Vec<_> = it.map(|e| e.version).collect();
        assert_eq!(rest, vec![2, 3]);
    }

    #[test]
    fn concurrent_iteration_never_sees_torn_entries() {
        let p = Arc::new(Perspective::new());
        let writer = {
            let p = Arc::clone(&p);
            thread::spawn(move || {
                for v in 1..=200i64 {
                    let key = format!("k{}", v % 10);
                    // Keys are revisited; the version always increases.
                    p.update(&key, v, hash(v as u8)).unwrap();
                }
            })
        };

        for _ in 0..50 {
            for entry in p.iter_latest() {
                assert!(entry.version > 0);
                assert_eq!(entry.hash, hash(entry.version as u8));
            }
        }
        writer.join().expect("writer should not panic");
        assert_eq!(p.iter_latest().count(), 10);
    }
}
