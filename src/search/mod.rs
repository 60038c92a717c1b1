//! Ranked search, score-only search and term lookup.
//!
//! Ranking needs every candidate scored before the best one is known, so the
//! search streams do all scoring on their first poll and then yield results
//! one at a time. Hydration of stored documents happens lazily as results
//! are pulled; abandoning a stream early skips the rest.

mod query;
mod scoring;

pub use query::Query;
pub use scoring::Scored;

use crate::{
    db::decode_counter,
    error::{Error, Result},
    fields::Fields,
    index::Index,
    store::{KeyRange, scan_stream},
};
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use std::{sync::Arc, time::Instant};

/// Options for [`Index::search_stream`] and [`Index::score_stream`].
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Fields to match and their weights. Everything counts once when unset.
    pub fields: Option<Fields>,
    /// Extra dictionary terms matched per query term by shared prefix.
    pub expansions: usize,
    pub offset: usize,
    pub limit: Option<usize>,
    /// Only document ids inside this range are scored.
    pub range: KeyRange,
}

impl SearchOptions {
    #[must_use]
    pub fn fields(mut self, fields: impl Into<Fields>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    #[must_use]
    pub const fn expansions(mut self, expansions: usize) -> Self {
        self.expansions = expansions;
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn range(mut self, range: KeyRange) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub fn gt(mut self, id: impl AsRef<[u8]>) -> Self {
        self.range = self.range.gt(id);
        self
    }

    #[must_use]
    pub fn gte(mut self, id: impl AsRef<[u8]>) -> Self {
        self.range = self.range.gte(id);
        self
    }

    #[must_use]
    pub fn lt(mut self, id: impl AsRef<[u8]>) -> Self {
        self.range = self.range.lt(id);
        self
    }

    #[must_use]
    pub fn lte(mut self, id: impl AsRef<[u8]>) -> Self {
        self.range = self.range.lte(id);
        self
    }
}

/// A ranked, hydrated search result.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub key: Vec<u8>,
    pub value: serde_json::Value,
    pub score: f64,
}

/// Options for [`Index::term_stream`].
#[derive(Debug, Clone, Default)]
pub struct TermOptions {
    /// Only terms starting with this prefix, the prefix itself included.
    pub prefix: Option<String>,
    pub range: KeyRange,
    pub limit: Option<usize>,
}

impl TermOptions {
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn range(mut self, range: KeyRange) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A term dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    pub term: String,
    /// Number of documents containing the term.
    pub frequency: u64,
}

impl TermEntry {
    /// The term as a key, `@` followed by the term.
    pub fn key(&self) -> String {
        format!("@{}", self.term)
    }
}

impl Index {
    /// Score and rank every matching document.
    pub async fn score(&self, query: &Query, options: &SearchOptions) -> Result<Vec<Scored>> {
        let start = Instant::now();
        if options.range.is_empty() {
            return Ok(Vec::new());
        }
        let terms = query.terms(self.pipeline_ref()).await?;
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let store = self.db().store().as_ref();
        let spaces = self.spaces();
        let matched = scoring::expand(store, &spaces.terms, &terms, options.expansions)?;
        let scores = scoring::accumulate(
            store,
            &spaces.postings,
            &matched,
            options.fields.as_ref(),
            &options.range,
        )?;
        let candidates = scores.len();
        let ranked = scoring::rank(scores, options.offset, options.limit);

        tracing::debug!(
            "Search {:?}: {} terms, {} matched, {} candidates, {} returned in {:?}",
            terms.keys().collect::<Vec<_>>(),
            terms.len(),
            matched.len(),
            candidates,
            ranked.len(),
            start.elapsed()
        );
        Ok(ranked)
    }

    /// Ranked ids and scores, without loading documents.
    pub fn score_stream(
        &self,
        query: impl Into<Query>,
        options: SearchOptions,
    ) -> BoxStream<'static, Result<Scored>> {
        let index = self.clone();
        let query = query.into();
        futures::stream::once(async move { index.score(&query, &options).await })
            .map_ok(|ranked| futures::stream::iter(ranked.into_iter().map(Ok)))
            .try_flatten()
            .boxed()
    }

    /// Ranked results with their stored documents.
    ///
    /// A document deleted between scoring and hydration is skipped.
    pub fn search_stream(
        &self,
        query: impl Into<Query>,
        options: SearchOptions,
    ) -> BoxStream<'static, Result<Hit>> {
        let index = self.clone();
        self.score_stream(query, options)
            .try_filter_map(move |scored| futures::future::ready(index.hydrate(scored)))
            .boxed()
    }

    fn hydrate(&self, scored: Scored) -> Result<Option<Hit>> {
        let Scored { key, score } = scored;
        match self.spaces().docs.get(self.db().store().as_ref(), &key)? {
            Some(bytes) => Ok(Some(Hit {
                value: serde_json::from_slice(&bytes)?,
                key,
                score,
            })),
            None => {
                tracing::warn!(
                    "Document {:?} vanished before it could be loaded",
                    String::from_utf8_lossy(&key)
                );
                Ok(None)
            }
        }
    }

    /// Dictionary terms in lexical order with their document frequencies.
    pub fn term_stream(&self, options: TermOptions) -> BoxStream<'static, Result<TermEntry>> {
        let range = match &options.prefix {
            Some(prefix) => options.range.intersect(&KeyRange::prefix(prefix)),
            None => options.range,
        };
        scan_stream(
            Arc::clone(self.db().store()),
            self.spaces().terms.clone(),
            range,
            options.limit,
            false,
            self.config().scan_page_size,
        )
        .map(|entry| -> Result<TermEntry> {
            let (key, bytes) = entry?;
            Ok(TermEntry {
                term: String::from_utf8(key).map_err(|e| Error::Codec(e.to_string()))?,
                frequency: decode_counter(&bytes)?,
            })
        })
        .boxed()
    }
}
