use super::{KeyRange, RawEntry, Store, StoreResult, prefix_end};
use std::ops::Bound;

/// A key prefix carving a sub-namespace out of one root store.
///
/// Namespaces nest: `root().sublevel("a").sublevel("b")` prefixes keys with
/// `!a!!b!`. Because every namespace shares the root store, one
/// [`WriteBatch`](super::WriteBatch) can span any number of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Namespace {
    prefix: Vec<u8>,
}

impl Namespace {
    /// The unprefixed root namespace.
    pub fn root() -> Self {
        Self::default()
    }

    /// A child namespace called `name`.
    #[must_use]
    pub fn sublevel(&self, name: &str) -> Self {
        let mut prefix = Vec::with_capacity(self.prefix.len() + name.len() + 2);
        prefix.extend_from_slice(&self.prefix);
        prefix.push(b'!');
        prefix.extend_from_slice(name.as_bytes());
        prefix.push(b'!');
        Self { prefix }
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// The root-store key for `key` inside this namespace.
    pub fn key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }

    /// Strip this namespace's prefix from a root-store key.
    pub fn strip<'k>(&self, full: &'k [u8]) -> Option<&'k [u8]> {
        full.strip_prefix(self.prefix.as_slice())
    }

    /// Translate a namespace-relative range into root-store bounds that never
    /// leave the namespace.
    pub fn range(&self, range: &KeyRange) -> KeyRange {
        let lower = match range.lower() {
            Bound::Included(key) => Bound::Included(self.key(key)),
            Bound::Excluded(key) => Bound::Excluded(self.key(key)),
            Bound::Unbounded if self.prefix.is_empty() => Bound::Unbounded,
            Bound::Unbounded => Bound::Included(self.prefix.clone()),
        };
        let upper = match range.upper() {
            Bound::Included(key) => Bound::Included(self.key(key)),
            Bound::Excluded(key) => Bound::Excluded(self.key(key)),
            Bound::Unbounded => prefix_end(&self.prefix).map_or(Bound::Unbounded, Bound::Excluded),
        };
        KeyRange::from_bounds(lower, upper)
    }

    /// Point read of a namespace-relative key.
    pub fn get(&self, store: &dyn Store, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        store.get(&self.key(key))
    }

    /// Range scan returning namespace-relative keys.
    pub fn scan(
        &self,
        store: &dyn Store,
        range: &KeyRange,
        limit: Option<usize>,
        reverse: bool,
    ) -> StoreResult<Vec<RawEntry>> {
        let entries = store.scan(&self.range(range), limit, reverse)?;
        Ok(entries
            .into_iter()
            .filter_map(|(key, value)| Some((self.strip(&key)?.to_vec(), value)))
            .collect())
    }
}
