mod common;

use assert2::{check, let_assert};
use common::{collect, corpus_entries, hit_keys};
use kvsearch::{Db, Error, Index, IndexConfig, MemoryStore, SearchOptions, destroy};
use std::sync::Arc;

async fn open(location: &std::path::Path) -> (Arc<MemoryStore>, Index) {
    let store = Arc::new(MemoryStore::open(location).await.unwrap());
    let index = Index::open(Db::from_store(store.clone()), IndexConfig::default()).unwrap();
    (store, index)
}

#[tokio::test]
async fn index_survives_reopen() {
    kvsearch::tracing::init();
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("search.db");

    let (store, index) = open(&location).await;
    index.batch(corpus_entries()).await.unwrap();
    store.persist().await.unwrap();
    drop(index);

    let (store, index) = open(&location).await;
    check!(!store.is_empty());
    check!(index.size().unwrap() == 4);
    let hits = collect(index.search_stream("green plant", SearchOptions::default())).await;
    check!(hit_keys(&hits) == vec!["b", "a", "c"]);
}

#[tokio::test]
async fn unpersisted_writes_are_lost() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("search.db");

    let (store, index) = open(&location).await;
    index.put("a", "green").await.unwrap();
    store.persist().await.unwrap();
    index.put("b", "plant").await.unwrap();

    let (_, index) = open(&location).await;
    check!(index.get("a").is_ok());
    let_assert!(Err(Error::NotFound(_)) = index.get("b"));
}

#[tokio::test]
async fn destroy_removes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("nested").join("search.db");

    let (store, index) = open(&location).await;
    index.put("a", "green").await.unwrap();
    store.persist().await.unwrap();
    check!(location.exists());

    destroy(&location).await.unwrap();
    check!(!location.exists());
    // Destroying twice is fine.
    destroy(&location).await.unwrap();

    let (store, index) = open(&location).await;
    check!(store.is_empty());
    let_assert!(Err(Error::NotFound(_)) = index.meta().get("size"));
}
