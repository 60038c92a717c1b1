//! Frequency-weighted relevance scoring.
//!
//! A document's score is the sum, over every matched `(field, term)` posting,
//! of `occurrences * field weight * term multiplier / document frequency`.
//! Dividing by the document frequency makes rare terms count for more than
//! common ones.

use super::query::WeightedTerms;
use crate::{
    db::decode_counter,
    error::Result,
    fields::{Fields, weight_of},
    keys::{PostingKey, posting_range},
    store::{KeyRange, Namespace, Store, prefix_end},
};
use ahash::AHashMap;
use std::{cmp::Ordering, collections::BTreeMap};

/// A ranked document id.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub key: Vec<u8>,
    pub score: f64,
}

/// A dictionary term selected for scoring.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Matched {
    /// Number of documents containing the term.
    pub(crate) frequency: u64,
    /// Summed multiplier of the query terms that selected it.
    pub(crate) multiplier: f64,
}

/// Look the query terms up in the dictionary, adding up to `expansions`
/// further terms per query term that extend it as a prefix.
///
/// Terms absent from the dictionary match nothing and are dropped.
pub(crate) fn expand(
    store: &dyn Store,
    dictionary: &Namespace,
    terms: &WeightedTerms,
    expansions: usize,
) -> Result<BTreeMap<String, Matched>> {
    let mut matched: BTreeMap<String, Matched> = BTreeMap::new();
    let mut add = |term: String, frequency: u64, multiplier: f64| {
        matched
            .entry(term)
            .and_modify(|m| m.multiplier += multiplier)
            .or_insert(Matched {
                frequency,
                multiplier,
            });
    };

    for (term, &multiplier) in terms {
        if let Some(bytes) = dictionary.get(store, term.as_bytes())? {
            add(term.clone(), decode_counter(&bytes)?, multiplier);
        }
        if expansions == 0 {
            continue;
        }

        let mut range = KeyRange::all().gt(term);
        if let Some(end) = prefix_end(term.as_bytes()) {
            range = range.lt(end);
        }
        for (key, bytes) in dictionary.scan(store, &range, Some(expansions), false)? {
            let expanded = String::from_utf8_lossy(&key).into_owned();
            add(expanded, decode_counter(&bytes)?, multiplier);
        }
    }
    Ok(matched)
}

/// Accumulate scores for every document with a posting for a matched term
/// whose id lies in `ids`.
pub(crate) fn accumulate(
    store: &dyn Store,
    postings: &Namespace,
    matched: &BTreeMap<String, Matched>,
    fields: Option<&Fields>,
    ids: &KeyRange,
) -> Result<AHashMap<Vec<u8>, f64>> {
    let mut scores: AHashMap<Vec<u8>, f64> = AHashMap::new();
    for (term, m) in matched {
        if m.frequency == 0 {
            continue;
        }
        let entries = postings.scan(store, &posting_range(term, ids), None, false)?;
        tracing::trace!("Term {:?}: {} postings", term, entries.len());

        for (key, bytes) in entries {
            let Some(posting) = PostingKey::decode(&key).filter(|p| p.term == *term) else {
                tracing::warn!("Skipping malformed posting key under term {:?}", term);
                continue;
            };
            let weight = weight_of(fields, &posting.field);
            if weight <= 0.0 {
                continue;
            }
            let count = decode_counter(&bytes)? as f64;
            *scores.entry(posting.id).or_insert(0.0) +=
                count * weight * m.multiplier / m.frequency as f64;
        }
    }
    Ok(scores)
}

fn by_rank(a: &Scored, b: &Scored) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key))
}

/// Order by descending score then ascending id, drop non-positive scores and
/// apply `offset` then `limit`.
pub(crate) fn rank(
    scores: AHashMap<Vec<u8>, f64>,
    offset: usize,
    limit: Option<usize>,
) -> Vec<Scored> {
    let mut ranked: Vec<Scored> = scores
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .map(|(key, score)| Scored { key, score })
        .collect();
    ranked.sort_by(by_rank);
    ranked
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, WriteBatch};
    use assert2::check;
    use rstest::rstest;

    fn scores(pairs: &[(&str, f64)]) -> AHashMap<Vec<u8>, f64> {
        pairs
            .iter()
            .map(|(id, score)| (id.as_bytes().to_vec(), *score))
            .collect()
    }

    fn ids(ranked: &[Scored]) -> Vec<&str> {
        ranked
            .iter()
            .map(|s| std::str::from_utf8(&s.key).unwrap())
            .collect()
    }

    #[rstest]
    #[case(0, None, vec!["b", "a", "c", "d"])]
    #[case(1, None, vec!["a", "c", "d"])]
    #[case(0, Some(2), vec!["b", "a"])]
    #[case(3, Some(5), vec!["d"])]
    #[case(9, None, vec![])]
    fn test_rank_orders_and_pages(
        #[case] offset: usize,
        #[case] limit: Option<usize>,
        #[case] expected: Vec<&str>,
    ) {
        let input = scores(&[("c", 1.0), ("a", 2.0), ("b", 3.0), ("d", 1.0), ("z", 0.0)]);
        check!(ids(&rank(input, offset, limit)) == expected);
    }

    fn dictionary(store: &MemoryStore, ns: &Namespace, terms: &[(&str, u64)]) {
        let mut batch = WriteBatch::new();
        for (term, df) in terms {
            batch.put(ns.key(term.as_bytes()), postcard::to_stdvec(df).unwrap());
        }
        store.write(batch).unwrap();
    }

    #[test]
    fn test_expansions_follow_dictionary_order() {
        let store = MemoryStore::new();
        let ns = Namespace::root().sublevel("terms");
        dictionary(&store, &ns, &[("pla", 1), ("plan", 4), ("plant", 2), ("plumb", 2), ("plz", 1)]);

        let query: WeightedTerms = [("pla".to_string(), 1.0)].into_iter().collect();
        let exact = expand(&store, &ns, &query, 0).unwrap();
        check!(exact.keys().collect::<Vec<_>>() == vec!["pla"]);

        let expanded = expand(&store, &ns, &query, 2).unwrap();
        check!(expanded.keys().collect::<Vec<_>>() == vec!["pla", "plan", "plant"]);
        check!(expanded["plan"].frequency == 4);

        let missing: WeightedTerms = [("zzz".to_string(), 1.0)].into_iter().collect();
        check!(expand(&store, &ns, &missing, 5).unwrap().is_empty());
    }

    #[test]
    fn test_overlapping_expansions_add_multipliers() {
        let store = MemoryStore::new();
        let ns = Namespace::root().sublevel("terms");
        dictionary(&store, &ns, &[("plant", 2)]);
        let query: WeightedTerms = [("pla".to_string(), 1.0), ("plant".to_string(), 2.0)]
            .into_iter()
            .collect();
        let expanded = expand(&store, &ns, &query, 1).unwrap();
        check!(expanded["plant"].multiplier == 3.0);
    }
}
