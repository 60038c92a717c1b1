//! Ordered byte-key storage the index is layered on.
//!
//! The index only needs point reads, bounded range scans and atomic batches,
//! so any sorted key-value engine can sit behind [`Store`]. Sub-namespaces are
//! key prefixes over one root store, which keeps a single [`WriteBatch`]
//! atomic across all of them.

mod memory;
mod namespace;
mod scan;

pub use memory::{MemoryStore, destroy};
pub use namespace::Namespace;
pub use scan::scan_stream;

use crate::error::StoreError;
use std::{fmt, ops::Bound};

/// Result of a raw store operation.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A key/value pair as stored.
pub type RawEntry = (Vec<u8>, Vec<u8>);

/// Sorted key-value storage with ranged iteration and atomic batches.
pub trait Store: Send + Sync + fmt::Debug {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Entries inside `range` in key order (descending when `reverse`),
    /// at most `limit` of them.
    fn scan(&self, range: &KeyRange, limit: Option<usize>, reverse: bool)
    -> StoreResult<Vec<RawEntry>>;

    /// Apply every operation in `batch` or none of them.
    fn write(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Remove every entry.
    fn clear(&self) -> StoreResult<()>;
}

/// Key bounds with the usual `gt`/`gte`/`lt`/`lte` semantics.
///
/// When both an exclusive and an inclusive bound are given on the same side,
/// the tighter one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub gt: Option<Vec<u8>>,
    pub gte: Option<Vec<u8>>,
    pub lt: Option<Vec<u8>>,
    pub lte: Option<Vec<u8>>,
}

impl KeyRange {
    /// The unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn gt(mut self, key: impl AsRef<[u8]>) -> Self {
        self.gt = Some(key.as_ref().to_vec());
        self
    }

    #[must_use]
    pub fn gte(mut self, key: impl AsRef<[u8]>) -> Self {
        self.gte = Some(key.as_ref().to_vec());
        self
    }

    #[must_use]
    pub fn lt(mut self, key: impl AsRef<[u8]>) -> Self {
        self.lt = Some(key.as_ref().to_vec());
        self
    }

    #[must_use]
    pub fn lte(mut self, key: impl AsRef<[u8]>) -> Self {
        self.lte = Some(key.as_ref().to_vec());
        self
    }

    /// Build a range from explicit bounds.
    pub fn from_bounds(lower: Bound<Vec<u8>>, upper: Bound<Vec<u8>>) -> Self {
        let mut range = Self::default();
        match lower {
            Bound::Included(key) => range.gte = Some(key),
            Bound::Excluded(key) => range.gt = Some(key),
            Bound::Unbounded => {}
        }
        match upper {
            Bound::Included(key) => range.lte = Some(key),
            Bound::Excluded(key) => range.lt = Some(key),
            Bound::Unbounded => {}
        }
        range
    }

    /// Every key starting with `prefix`.
    pub fn prefix(prefix: impl AsRef<[u8]>) -> Self {
        let prefix = prefix.as_ref();
        let upper = prefix_end(prefix).map_or(Bound::Unbounded, Bound::Excluded);
        Self::from_bounds(Bound::Included(prefix.to_vec()), upper)
    }

    /// Effective lower bound.
    pub fn lower(&self) -> Bound<&[u8]> {
        tighter_lower(
            self.gt.as_deref().map_or(Bound::Unbounded, Bound::Excluded),
            self.gte.as_deref().map_or(Bound::Unbounded, Bound::Included),
        )
    }

    /// Effective upper bound.
    pub fn upper(&self) -> Bound<&[u8]> {
        tighter_upper(
            self.lt.as_deref().map_or(Bound::Unbounded, Bound::Excluded),
            self.lte.as_deref().map_or(Bound::Unbounded, Bound::Included),
        )
    }

    /// The keys inside both ranges.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self::from_bounds(
            owned(tighter_lower(self.lower(), other.lower())),
            owned(tighter_upper(self.upper(), other.upper())),
        )
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let above = match self.lower() {
            Bound::Included(lower) => key >= lower,
            Bound::Excluded(lower) => key > lower,
            Bound::Unbounded => true,
        };
        let below = match self.upper() {
            Bound::Included(upper) => key <= upper,
            Bound::Excluded(upper) => key < upper,
            Bound::Unbounded => true,
        };
        above && below
    }

    /// Whether the bounds contradict each other, e.g. `lt` at or below `gt`.
    pub fn is_empty(&self) -> bool {
        match (self.lower(), self.upper()) {
            (Bound::Included(lower), Bound::Included(upper)) => lower > upper,
            (Bound::Included(lower) | Bound::Excluded(lower), Bound::Excluded(upper))
            | (Bound::Excluded(lower), Bound::Included(upper)) => lower >= upper,
            _ => false,
        }
    }
}

fn tighter_lower<'a>(a: Bound<&'a [u8]>, b: Bound<&'a [u8]>) -> Bound<&'a [u8]> {
    match (a, b) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other,
        (a, b) => {
            let (ka, kb) = (bound_key(a), bound_key(b));
            if ka > kb || (ka == kb && matches!(a, Bound::Excluded(_))) {
                a
            } else {
                b
            }
        }
    }
}

fn tighter_upper<'a>(a: Bound<&'a [u8]>, b: Bound<&'a [u8]>) -> Bound<&'a [u8]> {
    match (a, b) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other,
        (a, b) => {
            let (ka, kb) = (bound_key(a), bound_key(b));
            if ka < kb || (ka == kb && matches!(a, Bound::Excluded(_))) {
                a
            } else {
                b
            }
        }
    }
}

fn bound_key(bound: Bound<&[u8]>) -> &[u8] {
    match bound {
        Bound::Included(key) | Bound::Excluded(key) => key,
        Bound::Unbounded => &[],
    }
}

fn owned(bound: Bound<&[u8]>) -> Bound<Vec<u8>> {
    match bound {
        Bound::Included(key) => Bound::Included(key.to_vec()),
        Bound::Excluded(key) => Bound::Excluded(key.to_vec()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

/// Smallest key greater than every key starting with `prefix`, if one exists.
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// One mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// An ordered set of mutations applied atomically by [`Store::write`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> &mut Self {
        self.ops.push(BatchOp::Put { key, value });
        self
    }

    pub fn delete(&mut self, key: Vec<u8>) -> &mut Self {
        self.ops.push(BatchOp::Delete { key });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BatchOp> {
        self.ops.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = BatchOp;
    type IntoIter = std::vec::IntoIter<BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case(KeyRange::all().gt("b").lt("b"), true)]
    #[case(KeyRange::all().gt("c").lt("b"), true)]
    #[case(KeyRange::all().gte("b").lte("b"), false)]
    #[case(KeyRange::all().gte("b").lt("b"), true)]
    #[case(KeyRange::all().gt("a").lt("b"), false)]
    #[case(KeyRange::all(), false)]
    fn test_is_empty(#[case] range: KeyRange, #[case] expected: bool) {
        check!(range.is_empty() == expected);
    }

    #[test]
    fn test_tighter_bound_wins() {
        let range = KeyRange::all().gt("b").gte("a").lt("y").lte("z");
        check!(range.lower() == Bound::Excluded(&b"b"[..]));
        check!(range.upper() == Bound::Excluded(&b"y"[..]));

        let same = KeyRange::all().gt("b").gte("b");
        check!(same.lower() == Bound::Excluded(&b"b"[..]));
    }

    #[rstest]
    #[case(b"a", false)]
    #[case(b"b", false)]
    #[case(b"ba", true)]
    #[case(b"c", true)]
    #[case(b"d", false)]
    fn test_contains(#[case] key: &[u8], #[case] expected: bool) {
        let range = KeyRange::all().gt("b").lte("c");
        check!(range.contains(key) == expected);
    }

    #[test]
    fn test_prefix_range() {
        let range = KeyRange::prefix("plumb");
        check!(range.contains(b"plumb"));
        check!(range.contains(b"plumbing"));
        check!(!range.contains(b"plumc"));
        check!(!range.contains(b"plum"));
    }

    #[test]
    fn test_prefix_end_carries() {
        check!(prefix_end(b"ab") == Some(b"ac".to_vec()));
        check!(prefix_end(&[b'a', 0xFF]) == Some(b"b".to_vec()));
        check!(prefix_end(&[0xFF, 0xFF]).is_none());
    }

    #[test]
    fn test_intersect() {
        let left = KeyRange::prefix("p");
        let right = KeyRange::all().gt("pl").lt("z");
        let both = left.intersect(&right);
        check!(both.contains(b"plumb"));
        check!(!both.contains(b"pl"));
        check!(!both.contains(b"q"));
    }
}
