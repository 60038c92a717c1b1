//! In-memory store with optional on-disk snapshots.

use super::{BatchOp, KeyRange, RawEntry, Store, StoreResult, WriteBatch};
use crate::error::StoreError;
use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// A `BTreeMap`-backed [`Store`].
///
/// Opened with a location, the whole map can be written to a postcard
/// snapshot with [`MemoryStore::persist`] and is reloaded by the next
/// [`MemoryStore::open`] of the same location.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    location: Option<PathBuf>,
}

impl MemoryStore {
    /// An empty store with no backing file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the store at `location`, loading its snapshot if one exists.
    pub async fn open(location: impl Into<PathBuf>) -> StoreResult<Self> {
        let location = location.into();
        let data = match tokio::fs::read(&location).await {
            Ok(bytes) => {
                let entries = tokio::task::spawn_blocking(move || {
                    postcard::from_bytes::<Vec<RawEntry>>(&bytes)
                })
                .await
                .map_err(|e| StoreError::Task(e.to_string()))??;
                tracing::info!(
                    "Loaded store snapshot {} ({} entries)",
                    location.display(),
                    entries.len()
                );
                entries.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No snapshot at {}, starting empty", location.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            data: RwLock::new(data),
            location: Some(location),
        })
    }

    /// Where snapshots are written, if anywhere.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Write a snapshot of the current contents to the store location.
    ///
    /// The snapshot is written next to the target and renamed over it, so a
    /// crash mid-write leaves the previous snapshot intact. Stores without a
    /// location do nothing.
    pub async fn persist(&self) -> StoreResult<()> {
        let Some(location) = self.location.clone() else {
            return Ok(());
        };
        let entries: Vec<RawEntry> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let count = entries.len();

        let bytes = tokio::task::spawn_blocking(move || postcard::to_stdvec(&entries))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;

        let staging = location.with_extension("tmp");
        if let Some(parent) = location.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &location).await?;

        tracing::info!(
            "Persisted store snapshot {} ({} entries)",
            location.display(),
            count
        );
        Ok(())
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn scan(
        &self,
        range: &KeyRange,
        limit: Option<usize>,
        reverse: bool,
    ) -> StoreResult<Vec<RawEntry>> {
        // BTreeMap::range panics on inverted bounds.
        if range.is_empty() || limit == Some(0) {
            return Ok(Vec::new());
        }
        let data = self.data.read();
        let entries = data.range::<[u8], _>((range.lower(), range.upper()));
        let limit = limit.unwrap_or(usize::MAX);
        let collect = |(k, v): (&Vec<u8>, &Vec<u8>)| (k.clone(), v.clone());
        Ok(if reverse {
            entries.rev().take(limit).map(collect).collect()
        } else {
            entries.take(limit).map(collect).collect()
        })
    }

    fn write(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut data = self.data.write();
        for op in batch {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.data.write().clear();
        Ok(())
    }
}

/// Irrecoverably remove the snapshot stored at `location`.
///
/// A location that holds nothing is not an error.
pub async fn destroy(location: impl AsRef<Path>) -> StoreResult<()> {
    let location = location.as_ref();
    match tokio::fs::remove_file(location).await {
        Ok(()) => {
            tracing::info!("Destroyed store at {}", location.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
