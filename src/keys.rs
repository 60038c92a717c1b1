//! Order-preserving key encodings for postings.
//!
//! A posting key is `component(term) ++ component(id) ++ field`. Each
//! component escapes `0x00` as `00 FF` and ends with `00 01`, which keeps
//! byte order equal to the order of the unescaped values and makes no
//! component a prefix of another. All postings of a term are therefore
//! contiguous and sorted by document id, so an id range becomes a key range.

use crate::store::KeyRange;
use std::ops::Bound;

const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0xFF;
const TERMINATOR: u8 = 0x01;
/// Sorts after every terminated component sharing the same open bytes.
const PAST: u8 = 0x02;

fn open(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        if b == ESCAPE {
            out.extend_from_slice(&[ESCAPE, ESCAPED_ZERO]);
        } else {
            out.push(b);
        }
    }
}

fn component(out: &mut Vec<u8>, bytes: &[u8]) {
    open(out, bytes);
    out.extend_from_slice(&[ESCAPE, TERMINATOR]);
}

/// Read one component, returning it and the remaining input.
fn take_component(input: &[u8]) -> Option<(Vec<u8>, &[u8])> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < input.len() {
        if input[i] == ESCAPE {
            match input.get(i + 1)? {
                &ESCAPED_ZERO => out.push(ESCAPE),
                &TERMINATOR => return Some((out, &input[i + 2..])),
                _ => return None,
            }
            i += 2;
        } else {
            out.push(input[i]);
            i += 1;
        }
    }
    None
}

/// A decoded posting key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PostingKey {
    pub(crate) term: String,
    pub(crate) id: Vec<u8>,
    pub(crate) field: String,
}

impl PostingKey {
    pub(crate) fn encode(term: &str, id: &[u8], field: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(term.len() + id.len() + field.len() + 4);
        component(&mut key, term.as_bytes());
        component(&mut key, id);
        key.extend_from_slice(field.as_bytes());
        key
    }

    pub(crate) fn decode(key: &[u8]) -> Option<Self> {
        let (term, rest) = take_component(key)?;
        let (id, field) = take_component(rest)?;
        Some(Self {
            term: String::from_utf8(term).ok()?,
            id,
            field: String::from_utf8(field.to_vec()).ok()?,
        })
    }
}

/// Key range covering the postings of `term` whose document id lies in `ids`.
pub(crate) fn posting_range(term: &str, ids: &KeyRange) -> KeyRange {
    let mut base = Vec::new();
    component(&mut base, term.as_bytes());

    let with_id = |id: &[u8], tail: u8| {
        let mut key = base.clone();
        open(&mut key, id);
        key.extend_from_slice(&[ESCAPE, tail]);
        key
    };

    let lower = match ids.lower() {
        Bound::Unbounded => base.clone(),
        Bound::Included(id) => with_id(id, TERMINATOR),
        Bound::Excluded(id) => with_id(id, PAST),
    };
    let upper = match ids.upper() {
        Bound::Unbounded => {
            let mut key = Vec::new();
            open(&mut key, term.as_bytes());
            key.extend_from_slice(&[ESCAPE, PAST]);
            key
        }
        Bound::Excluded(id) => with_id(id, TERMINATOR),
        Bound::Included(id) => with_id(id, PAST),
    };
    KeyRange::from_bounds(Bound::Included(lower), Bound::Excluded(upper))
}
