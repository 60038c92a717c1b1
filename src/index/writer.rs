//! Write path: tokenize, diff against the previous posting set, stage.
//!
//! Every write follows the same order. Tokenization and JSON encoding run
//! first and may fail without touching anything. The document id is then
//! locked for the rest of the transaction, its previous posting set is read
//! through the transaction, and the difference is staged. Nothing becomes
//! visible until the transaction commits.
//!
//! The self-committing forms (`put`, `delete`, `batch`) run on a spawned
//! task, so once polled they reach commit or failure even if the caller
//! stops waiting. The `*_in` forms leave that to the transaction owner.

use super::{
    Index,
    batch::{BatchEntry, Operation, PutOptions},
    events::{Event, OpKind},
};
use crate::{
    db::Transaction,
    error::{Error, Result},
    fields::Fields,
    keys::PostingKey,
    value::Value,
};
use std::collections::{BTreeMap, BTreeSet};

/// Occurrence counts keyed by `(field, term)`; one per document.
pub(crate) type PostingSet = BTreeMap<(String, String), u64>;

/// A tokenized put, ready to stage.
struct PreparedPut {
    id: Vec<u8>,
    json: serde_json::Value,
    postings: PostingSet,
}

enum Prepared {
    Put(PreparedPut),
    Del(Vec<u8>),
}

impl Prepared {
    fn id(&self) -> &[u8] {
        match self {
            Self::Put(put) => &put.id,
            Self::Del(id) => id,
        }
    }
}

fn terms_of(postings: &PostingSet) -> BTreeSet<&str> {
    postings.keys().map(|(_, term)| term.as_str()).collect()
}

/// Drive a self-committing write on its own task. Dropping the returned
/// future stops waiting for the outcome, not the write.
async fn run_detached<F>(write: F) -> Result<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(write).await?
}

impl Index {
    /// Insert or replace the document stored under `id`.
    pub async fn put(&self, id: impl AsRef<[u8]>, value: impl Into<Value>) -> Result<()> {
        self.put_with(id, value, PutOptions::default()).await
    }

    pub async fn put_with(
        &self,
        id: impl AsRef<[u8]>,
        value: impl Into<Value>,
        options: PutOptions,
    ) -> Result<()> {
        let (index, id, value) = (self.clone(), id.as_ref().to_vec(), value.into());
        run_detached(async move {
            let mut tx = index.db().transaction();
            index.put_in(&mut tx, id, value, options).await?;
            tx.commit()
        })
        .await
    }

    /// Stage a put inside a caller-supplied transaction.
    pub async fn put_in(
        &self,
        tx: &mut Transaction,
        id: impl AsRef<[u8]>,
        value: impl Into<Value>,
        options: PutOptions,
    ) -> Result<()> {
        self.check_transaction(tx)?;
        let value = value.into();
        let prepared = self
            .prepare_put(id.as_ref(), &value, options.fields.as_ref())
            .await?;
        tx.lock(self.spaces().docs.key(&prepared.id)).await;
        self.stage_put(tx, prepared).inspect_err(|_| tx.abort())
    }

    /// Remove the document stored under `id`, if any.
    pub async fn delete(&self, id: impl AsRef<[u8]>) -> Result<()> {
        let (index, id) = (self.clone(), id.as_ref().to_vec());
        run_detached(async move {
            let mut tx = index.db().transaction();
            index.delete_in(&mut tx, id).await?;
            tx.commit()
        })
        .await
    }

    /// Stage a delete inside a caller-supplied transaction.
    pub async fn delete_in(&self, tx: &mut Transaction, id: impl AsRef<[u8]>) -> Result<()> {
        self.check_transaction(tx)?;
        let id = id.as_ref().to_vec();
        tx.lock(self.spaces().docs.key(&id)).await;
        self.stage_delete(tx, id).inspect_err(|_| tx.abort())
    }

    /// Apply several puts and deletes atomically.
    ///
    /// Entries apply in order, so later entries see earlier ones. A malformed
    /// entry or a tokenization failure anywhere rejects the whole batch before
    /// anything is staged.
    pub async fn batch(&self, entries: impl IntoIterator<Item = BatchEntry>) -> Result<()> {
        let (index, entries) = (self.clone(), entries.into_iter().collect::<Vec<_>>());
        run_detached(async move {
            let mut tx = index.db().transaction();
            index.batch_in(&mut tx, entries).await?;
            tx.commit()
        })
        .await
    }

    /// Stage a batch inside a caller-supplied transaction.
    pub async fn batch_in(
        &self,
        tx: &mut Transaction,
        entries: impl IntoIterator<Item = BatchEntry>,
    ) -> Result<()> {
        self.check_transaction(tx)?;
        let operations = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| Operation::validate(index, entry))
            .collect::<Result<Vec<_>>>()?;

        let mut prepared = Vec::with_capacity(operations.len());
        for operation in operations {
            prepared.push(match operation {
                Operation::Put { id, value, fields } => {
                    Prepared::Put(self.prepare_put(&id, &value, fields.as_ref()).await?)
                }
                Operation::Del { id } => Prepared::Del(id),
            });
        }

        // Sorted so that concurrent batches cannot deadlock each other.
        let locks: BTreeSet<Vec<u8>> = prepared
            .iter()
            .map(|op| self.spaces().docs.key(op.id()))
            .collect();
        for key in locks {
            tx.lock(key).await;
        }

        for op in prepared {
            let staged = match op {
                Prepared::Put(put) => self.stage_put(tx, put),
                Prepared::Del(id) => self.stage_delete(tx, id),
            };
            staged.inspect_err(|_| tx.abort())?;
        }
        Ok(())
    }

    fn check_transaction(&self, tx: &Transaction) -> Result<()> {
        if !tx.db().same(self.db()) {
            return Err(Error::TransactionMismatch);
        }
        if tx.is_aborted() {
            return Err(Error::TransactionAborted);
        }
        Ok(())
    }

    async fn prepare_put(
        &self,
        id: &[u8],
        value: &Value,
        fields: Option<&Fields>,
    ) -> Result<PreparedPut> {
        let tokens = self.pipeline_ref().process_fields(value, fields).await?;
        let json = value.to_json()?;

        let mut postings = PostingSet::new();
        for (field, terms) in tokens {
            for term in terms {
                *postings.entry((field.clone(), term)).or_insert(0) += 1;
            }
        }
        Ok(PreparedPut {
            id: id.to_vec(),
            json,
            postings,
        })
    }

    /// The posting set currently recorded for `id`, as seen by `tx`.
    fn posting_set(&self, tx: &Transaction, id: &[u8]) -> Result<PostingSet> {
        match tx.get_raw(&self.spaces().forward.key(id))? {
            Some(bytes) => Ok(postcard::from_bytes(&bytes)?),
            None => Ok(PostingSet::new()),
        }
    }

    fn stage_put(&self, tx: &mut Transaction, put: PreparedPut) -> Result<()> {
        let spaces = self.spaces();
        let PreparedPut { id, json, postings } = put;
        let doc_key = spaces.docs.key(&id);
        let existed = tx.get_raw(&doc_key)?.is_some();
        let previous = self.posting_set(tx, &id)?;

        for (field, term) in previous.keys().filter(|key| !postings.contains_key(*key)) {
            tx.delete_raw(spaces.postings.key(&PostingKey::encode(term, &id, field)));
        }
        for ((field, term), count) in &postings {
            if previous.get(&(field.clone(), term.clone())) != Some(count) {
                tx.put_raw(
                    spaces.postings.key(&PostingKey::encode(term, &id, field)),
                    postcard::to_stdvec(count)?,
                );
            }
        }

        let (old_terms, new_terms) = (terms_of(&previous), terms_of(&postings));
        for term in old_terms.difference(&new_terms) {
            tx.add(spaces.terms.key(term.as_bytes()), -1);
        }
        for term in new_terms.difference(&old_terms) {
            tx.add(spaces.terms.key(term.as_bytes()), 1);
        }

        if postings.is_empty() {
            tx.delete_raw(spaces.forward.key(&id));
        } else {
            tx.put_raw(spaces.forward.key(&id), postcard::to_stdvec(&postings)?);
        }
        tx.put_raw(doc_key, serde_json::to_vec(&json)?);
        if !existed {
            tx.add(spaces.meta.key(b"size"), 1);
        }

        let events = self.events().clone();
        tx.on_commit(move || {
            events.emit(Event {
                kind: OpKind::Put,
                key: id,
                value: Some(json),
            });
        });
        Ok(())
    }

    fn stage_delete(&self, tx: &mut Transaction, id: Vec<u8>) -> Result<()> {
        let spaces = self.spaces();
        let doc_key = spaces.docs.key(&id);
        let existed = tx.get_raw(&doc_key)?.is_some();
        let previous = self.posting_set(tx, &id)?;

        for (field, term) in previous.keys() {
            tx.delete_raw(spaces.postings.key(&PostingKey::encode(term, &id, field)));
        }
        for term in terms_of(&previous) {
            tx.add(spaces.terms.key(term.as_bytes()), -1);
        }
        tx.delete_raw(spaces.forward.key(&id));
        tx.delete_raw(doc_key);
        if existed {
            tx.add(spaces.meta.key(b"size"), -1);
        }

        let events = self.events().clone();
        tx.on_commit(move || {
            events.emit(Event {
                kind: OpKind::Del,
                key: id,
                value: None,
            });
        });
        Ok(())
    }

    /// Occurrence count stored for one posting, as seen by `tx`.
    #[cfg(test)]
    pub(crate) fn posting_count(
        &self,
        tx: &Transaction,
        term: &str,
        id: &[u8],
        field: &str,
    ) -> Result<Option<u64>> {
        tx.get_raw(
            &self
                .spaces()
                .postings
                .key(&PostingKey::encode(term, id, field)),
        )?
        .as_deref()
        .map(crate::db::decode_counter)
        .transpose()
    }
}
