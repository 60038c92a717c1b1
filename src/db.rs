//! Database handle and cross-namespace transactions.

use crate::{
    error::{Error, Result},
    store::{MemoryStore, Namespace, Store, WriteBatch},
};
use ahash::AHashMap;
use std::{
    collections::BTreeMap,
    fmt,
    sync::Arc,
    time::Instant,
};
use tokio::sync::OwnedMutexGuard;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// Per-key async locks, created on demand and dropped once unused.
#[derive(Debug, Default)]
struct LockTable {
    slots: parking_lot::Mutex<AHashMap<Vec<u8>, Slot>>,
}

impl LockTable {
    async fn lock(self: &Arc<Self>, key: Vec<u8>) -> KeyGuard {
        let slot = Arc::clone(self.slots.lock().entry(key.clone()).or_default());
        let guard = slot.lock_owned().await;
        KeyGuard {
            table: Arc::clone(self),
            key,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Exclusive hold on one key until dropped.
struct KeyGuard {
    table: Arc<LockTable>,
    key: Vec<u8>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the slot under the table lock, so a count of one here
        // means nobody else wants it.
        let mut slots = self.table.slots.lock();
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}

struct DbInner {
    store: Arc<dyn Store>,
    locks: Arc<LockTable>,
    /// Serializes the read of counter values with the batch write.
    commit: parking_lot::Mutex<()>,
}

/// Shared handle to a root store.
///
/// Cloning is cheap; clones refer to the same store, lock table and commit
/// point.
#[derive(Clone)]
pub struct Db {
    inner: Arc<DbInner>,
}

impl Db {
    pub fn new(store: impl Store + 'static) -> Self {
        Self::from_store(Arc::new(store))
    }

    pub fn from_store(store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(DbInner {
                store,
                locks: Arc::default(),
                commit: parking_lot::Mutex::new(()),
            }),
        }
    }

    /// A database over a fresh, unpersisted [`MemoryStore`].
    pub fn memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    /// Start a transaction. Nothing is written until [`Transaction::commit`].
    pub fn transaction(&self) -> Transaction {
        Transaction {
            db: self.clone(),
            writes: BTreeMap::new(),
            counters: AHashMap::new(),
            guards: AHashMap::new(),
            after_commit: Vec::new(),
            aborted: false,
        }
    }

    /// Whether both handles refer to the same database.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[cfg(test)]
    fn held_locks(&self) -> usize {
        self.inner.locks.len()
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("store", &self.inner.store)
            .finish_non_exhaustive()
    }
}

/// Decode a stored counter value.
pub(crate) fn decode_counter(bytes: &[u8]) -> Result<u64> {
    Ok(postcard::from_bytes(bytes)?)
}

/// A set of mutations across namespaces that commits atomically.
///
/// Reads through the transaction see its own staged writes. Counter deltas
/// accumulate and are folded into the stored values at commit, so concurrent
/// transactions adjusting the same counter never lose updates. Dropping a
/// transaction without committing discards everything it staged.
pub struct Transaction {
    db: Db,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    counters: AHashMap<Vec<u8>, i64>,
    guards: AHashMap<Vec<u8>, KeyGuard>,
    after_commit: Vec<Box<dyn FnOnce() + Send>>,
    aborted: bool,
}

impl Transaction {
    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn put(&mut self, namespace: &Namespace, key: &[u8], value: Vec<u8>) {
        self.put_raw(namespace.key(key), value);
    }

    pub fn delete(&mut self, namespace: &Namespace, key: &[u8]) {
        self.delete_raw(namespace.key(key));
    }

    pub fn get(&self, namespace: &Namespace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.get_raw(&namespace.key(key))
    }

    /// Number of staged writes and counter adjustments.
    pub fn len(&self) -> usize {
        self.writes.len() + self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub(crate) fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    pub(crate) fn delete_raw(&mut self, key: Vec<u8>) {
        self.writes.insert(key, None);
    }

    pub(crate) fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => Ok(self.db.inner.store.get(key)?),
        }
    }

    /// Adjust the counter stored at `key` by `delta` on commit. A counter that
    /// ends at zero or below is removed.
    pub(crate) fn add(&mut self, key: Vec<u8>, delta: i64) {
        *self.counters.entry(key).or_insert(0) += delta;
    }

    /// Hold `key` exclusively until this transaction commits or is dropped.
    pub(crate) async fn lock(&mut self, key: Vec<u8>) {
        if self.guards.contains_key(&key) {
            return;
        }
        let guard = self.db.inner.locks.lock(key.clone()).await;
        self.guards.insert(key, guard);
    }

    /// Run `notify` once the transaction has committed successfully.
    pub(crate) fn on_commit(&mut self, notify: impl FnOnce() + Send + 'static) {
        self.after_commit.push(Box::new(notify));
    }

    /// Poison the transaction so that its commit writes nothing.
    pub(crate) fn abort(&mut self) {
        self.aborted = true;
    }

    /// Write everything staged as one atomic batch, then publish queued
    /// notifications.
    pub fn commit(self) -> Result<()> {
        let Self {
            db,
            mut writes,
            counters,
            guards,
            after_commit,
            aborted,
        } = self;
        if aborted {
            return Err(Error::TransactionAborted);
        }

        let start = Instant::now();
        let touched = counters.len();
        {
            let _commit = db.inner.commit.lock();
            for (key, delta) in counters {
                if delta == 0 {
                    continue;
                }
                let stored = match writes.get(&key) {
                    Some(staged) => staged.clone(),
                    None => db.inner.store.get(&key)?,
                };
                let current = stored.as_deref().map(decode_counter).transpose()?;
                let current = i64::try_from(current.unwrap_or(0))
                    .map_err(|e| Error::Codec(e.to_string()))?;
                match u64::try_from(current.saturating_add(delta)) {
                    Ok(next) if next > 0 => {
                        writes.insert(key, Some(postcard::to_stdvec(&next)?));
                    }
                    _ => {
                        writes.insert(key, None);
                    }
                }
            }

            let mut batch = WriteBatch::new();
            for (key, value) in writes {
                match value {
                    Some(value) => batch.put(key, value),
                    None => batch.delete(key),
                };
            }
            let ops = batch.len();
            db.inner.store.write(batch)?;
            tracing::debug!(
                "Committed batch: {} ops, {} counters in {:?}",
                ops,
                touched,
                start.elapsed()
            );
        }

        drop(guards);
        for notify in after_commit {
            notify();
        }
        Ok(())
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("writes", &self.writes.len())
            .field("counters", &self.counters.len())
            .field("locked", &self.guards.len())
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}
