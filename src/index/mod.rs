//! The search index handle.
//!
//! An [`Index`] lives in one namespace of a [`Db`] and splits it into five
//! sub-namespaces: stored documents, postings, each document's current
//! posting set, the term dictionary and metadata counters. Every write
//! touches them through one [`Transaction`](crate::Transaction), so they
//! change together or not at all.

pub mod batch;
pub mod events;
mod writer;

use crate::{
    config::IndexConfig,
    db::{Db, Transaction, decode_counter},
    error::{Error, Result},
    pipeline::Pipeline,
    store::{KeyRange, Namespace, scan_stream},
    value::Value,
};
use events::{Event, Events, OpKind};
use futures::{StreamExt, stream::BoxStream};
use std::sync::Arc;
use tokio::sync::broadcast;

/// The sub-namespaces of one index.
#[derive(Debug, Clone)]
pub(crate) struct Spaces {
    pub(crate) docs: Namespace,
    pub(crate) postings: Namespace,
    pub(crate) forward: Namespace,
    pub(crate) terms: Namespace,
    pub(crate) meta: Namespace,
}

impl Spaces {
    fn new(root: &Namespace) -> Self {
        Self {
            docs: root.sublevel("docs"),
            postings: root.sublevel("postings"),
            forward: root.sublevel("forward"),
            terms: root.sublevel("terms"),
            meta: root.sublevel("meta"),
        }
    }
}

#[derive(Debug)]
struct IndexInner {
    db: Db,
    spaces: Spaces,
    pipeline: Pipeline,
    config: IndexConfig,
    events: Events,
}

/// Full-text index over documents stored in a [`Db`].
///
/// Cloning is cheap and clones share everything, including event channels.
#[derive(Debug, Clone)]
pub struct Index {
    inner: Arc<IndexInner>,
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: serde_json::Value,
}

/// Options for [`Index::read_stream`].
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub range: KeyRange,
    pub limit: Option<usize>,
    pub reverse: bool,
}

impl ReadOptions {
    #[must_use]
    pub fn range(mut self, range: KeyRange) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub fn gt(mut self, key: impl AsRef<[u8]>) -> Self {
        self.range = self.range.gt(key);
        self
    }

    #[must_use]
    pub fn gte(mut self, key: impl AsRef<[u8]>) -> Self {
        self.range = self.range.gte(key);
        self
    }

    #[must_use]
    pub fn lt(mut self, key: impl AsRef<[u8]>) -> Self {
        self.range = self.range.lt(key);
        self
    }

    #[must_use]
    pub fn lte(mut self, key: impl AsRef<[u8]>) -> Self {
        self.range = self.range.lte(key);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// Read-only view of the metadata counters.
#[derive(Debug, Clone)]
pub struct Meta {
    db: Db,
    namespace: Namespace,
}

impl Meta {
    /// Current value of counter `name`. Counters at zero are absent.
    pub fn get(&self, name: &str) -> Result<u64> {
        match self.namespace.get(self.db.store().as_ref(), name.as_bytes())? {
            Some(bytes) => decode_counter(&bytes),
            None => Err(Error::NotFound(format!("meta key {name:?}"))),
        }
    }
}

impl Index {
    /// Open an index in the root namespace of `db` with the default pipeline
    /// for `config`.
    pub fn open(db: Db, config: IndexConfig) -> Result<Self> {
        let pipeline = Pipeline::from_config(&config);
        Self::open_with(db, Namespace::root(), pipeline, config)
    }

    /// Open an index inside `namespace` with a custom pipeline.
    pub fn open_with(
        db: Db,
        namespace: Namespace,
        pipeline: Pipeline,
        config: IndexConfig,
    ) -> Result<Self> {
        let config = config.validate()?;
        tracing::info!(
            "Opened index at {:?} with {} pipeline stages",
            String::from_utf8_lossy(namespace.prefix()),
            pipeline.stages()
        );
        Ok(Self::build(db, &namespace, pipeline, config))
    }

    /// An index over a fresh in-memory database.
    pub fn memory() -> Self {
        Self::build(
            Db::memory(),
            &Namespace::root(),
            Pipeline::default(),
            IndexConfig::default(),
        )
    }

    fn build(db: Db, namespace: &Namespace, pipeline: Pipeline, config: IndexConfig) -> Self {
        let events = Events::new(config.event_capacity);
        Self {
            inner: Arc::new(IndexInner {
                db,
                spaces: Spaces::new(namespace),
                pipeline,
                config,
                events,
            }),
        }
    }

    pub fn db(&self) -> &Db {
        &self.inner.db
    }

    pub fn config(&self) -> &IndexConfig {
        &self.inner.config
    }

    /// Start a transaction on the underlying database.
    pub fn transaction(&self) -> Transaction {
        self.inner.db.transaction()
    }

    pub(crate) fn spaces(&self) -> &Spaces {
        &self.inner.spaces
    }

    pub(crate) fn pipeline_ref(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub(crate) fn events(&self) -> &Events {
        &self.inner.events
    }

    /// The stored value of document `id`.
    pub fn get(&self, id: impl AsRef<[u8]>) -> Result<serde_json::Value> {
        let id = id.as_ref();
        match self.spaces().docs.get(self.db().store().as_ref(), id)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Err(Error::NotFound(format!(
                "document {:?}",
                String::from_utf8_lossy(id)
            ))),
        }
    }

    /// Stored documents in id order, fetched lazily page by page.
    pub fn read_stream(&self, options: ReadOptions) -> BoxStream<'static, Result<Entry>> {
        scan_stream(
            Arc::clone(self.db().store()),
            self.spaces().docs.clone(),
            options.range,
            options.limit,
            options.reverse,
            self.config().scan_page_size,
        )
        .map(|entry| -> Result<Entry> {
            let (key, bytes) = entry?;
            Ok(Entry {
                key,
                value: serde_json::from_slice(&bytes)?,
            })
        })
        .boxed()
    }

    pub fn meta(&self) -> Meta {
        Meta {
            db: self.db().clone(),
            namespace: self.spaces().meta.clone(),
        }
    }

    /// Number of stored documents.
    pub fn size(&self) -> Result<u64> {
        match self.meta().get("size") {
            Err(Error::NotFound(_)) => Ok(0),
            other => other,
        }
    }

    /// Tokenize `value` with this index's pipeline.
    pub async fn pipeline(&self, value: impl Into<Value>) -> Result<Vec<String>> {
        self.inner.pipeline.process(&value.into()).await
    }

    /// Blocking form of [`Index::pipeline`].
    ///
    /// Must not be called from inside an async runtime; stages that need a
    /// runtime (timers, I/O) will not make progress.
    pub fn pipeline_blocking(&self, value: impl Into<Value>) -> Result<Vec<String>> {
        futures::executor::block_on(self.pipeline(value))
    }

    /// Receive every committed operation of `kind` from now on.
    pub fn subscribe(&self, kind: OpKind) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe(kind)
    }
}
