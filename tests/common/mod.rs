//! Shared fixtures for integration tests.
//!
//! Every fixture builds a fresh in-memory index, so tests never observe each
//! other's writes.

use futures::{Stream, TryStreamExt};
use kvsearch::{BatchEntry, Hit, Index, Scored};
use rstest::fixture;
use serde_json::{Value, json};

/// The four-document murder-mystery corpus.
#[allow(dead_code)] // Used across different integration test crates
pub fn corpus() -> Vec<Value> {
    vec![
        json!({
            "id": "a",
            "title": "Mr. Green kills Colonel Mustard",
            "body": "Mr. Green killed Colonel Mustard in the study with the candlestick. \
                     Mr. Green is not a very nice fellow."
        }),
        json!({
            "id": "b",
            "title": "Plumb waters plant",
            "body": "Professor Plumb has a green plant in his study"
        }),
        json!({
            "id": "c",
            "title": "Scarlett helps Professor",
            "body": "Miss Scarlett watered Professor Plumbs green plant while he was away \
                     from his office last week."
        }),
        json!({
            "id": "d",
            "title": "foo",
            "body": "bar"
        }),
    ]
}

/// Batch entries putting every corpus document under its `id`.
#[allow(dead_code)]
pub fn corpus_entries() -> Vec<BatchEntry> {
    corpus()
        .into_iter()
        .map(|doc| {
            let id = doc["id"].as_str().unwrap_or_default().to_string();
            BatchEntry::put(id, doc)
        })
        .collect()
}

/// An empty in-memory index.
#[fixture]
pub fn index() -> Index {
    kvsearch::tracing::init();
    Index::memory()
}

/// An in-memory index holding the corpus.
#[allow(dead_code)]
pub async fn seeded() -> Index {
    kvsearch::tracing::init();
    let index = Index::memory();
    index
        .batch(corpus_entries())
        .await
        .expect("Failed to load corpus");
    index
}

/// Drain a result stream, panicking on the first error.
#[allow(dead_code)]
pub async fn collect<T, S>(stream: S) -> Vec<T>
where
    S: Stream<Item = kvsearch::Result<T>>,
{
    stream.try_collect().await.expect("Stream failed")
}

#[allow(dead_code)]
pub fn hit_keys(hits: &[Hit]) -> Vec<String> {
    hits.iter()
        .map(|hit| String::from_utf8_lossy(&hit.key).into_owned())
        .collect()
}

#[allow(dead_code)]
pub fn scored_keys(scored: &[Scored]) -> Vec<String> {
    scored
        .iter()
        .map(|s| String::from_utf8_lossy(&s.key).into_owned())
        .collect()
}
