//! Ascending-key cursors.

use crate::types::Key;
use recordkit_codec::Value;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Walks an object store's records in ascending key order.
///
/// Each [`Cursor::advance`] yields to the scheduler before producing the
/// next record, so long scans do not starve other tasks. The cursor
/// remembers the last key it returned and resumes after it.
pub struct Cursor<'a> {
    records: &'a BTreeMap<Key, Value>,
    last: Option<Key>,
    exhausted: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(records: &'a BTreeMap<Key, Value>) -> Self {
        Self {
            records,
            last: None,
            exhausted: false,
        }
    }

    /// Moves to the next record, returning `None` once the store is exhausted.
    pub async fn advance(&mut self) -> Option<(Key, &'a Value)> {
        tokio::task::yield_now().await;
        self.step()
    }

    /// Key of the record most recently returned.
    #[must_use]
    pub fn key(&self) -> Option<Key> {
        self.last
    }

    fn step(&mut self) -> Option<(Key, &'a Value)> {
        if self.exhausted {
            return None;
        }
        let lower = self.last.map_or(Bound::Unbounded, Bound::Excluded);
        match self.records.range((lower, Bound::Unbounded)).next() {
            Some((key, value)) => {
                self.last = Some(*key);
                Some((*key, value))
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }
}
