//! Embeddable full-text search over an ordered key-value store.
//!
//! ```no_run
//! # async fn demo() -> kvsearch::Result<()> {
//! use futures::TryStreamExt;
//! use kvsearch::{Index, SearchOptions};
//!
//! let index = Index::memory();
//! index.put("b", serde_json::json!({"title": "Plumb waters plant"})).await?;
//! let hits: Vec<_> = index
//!     .search_stream("watering", SearchOptions::default())
//!     .try_collect()
//!     .await?;
//! assert_eq!(hits[0].key, b"b");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod index;
mod keys;
pub mod pipeline;
pub mod search;
pub mod store;
pub mod tracing;
pub mod value;

pub use config::{IndexConfig, Language};
pub use db::{Db, Transaction};
pub use error::{Error, Result, StoreError};
pub use fields::Fields;
pub use index::{
    Entry, Index, Meta, ReadOptions,
    batch::{BatchEntry, PutOptions},
    events::{Event, OpKind},
};
pub use pipeline::{Pipeline, Stage};
pub use search::{Hit, Query, Scored, SearchOptions, TermEntry, TermOptions};
pub use store::{KeyRange, MemoryStore, Namespace, Store, destroy};
pub use value::Value;
