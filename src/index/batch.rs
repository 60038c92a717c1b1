//! Write options and batch entries.

use super::events::OpKind;
use crate::{fields::Fields, value::Value};
use serde::{Deserialize, Deserializer};

/// Options for a single put.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PutOptions {
    /// Index only these fields of an object value. Other fields are still
    /// stored but are not searchable.
    pub fields: Option<Fields>,
}

impl PutOptions {
    #[must_use]
    pub fn fields(mut self, fields: impl Into<Fields>) -> Self {
        self.fields = Some(fields.into());
        self
    }
}

/// One operation of an atomic batch.
///
/// Deserializes from `{"type": "put" | "del", "key": ..., "value": ...,
/// "fields": ...}`. Missing pieces are reported when the batch runs, so that
/// one bad entry fails the whole batch.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry {
    #[serde(rename = "type")]
    pub kind: OpKind,
    #[serde(default, deserialize_with = "text_key")]
    pub key: Option<Vec<u8>>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub fields: Option<Fields>,
}

fn text_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(String::into_bytes))
}

impl BatchEntry {
    pub fn put(key: impl AsRef<[u8]>, value: impl Into<Value>) -> Self {
        Self {
            kind: OpKind::Put,
            key: Some(key.as_ref().to_vec()),
            value: Some(value.into()),
            fields: None,
        }
    }

    pub fn del(key: impl AsRef<[u8]>) -> Self {
        Self {
            kind: OpKind::Del,
            key: Some(key.as_ref().to_vec()),
            value: None,
            fields: None,
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: impl Into<Fields>) -> Self {
        self.fields = Some(fields.into());
        self
    }
}

/// A batch entry that passed validation.
#[derive(Debug)]
pub(crate) enum Operation {
    Put {
        id: Vec<u8>,
        value: Value,
        fields: Option<Fields>,
    },
    Del {
        id: Vec<u8>,
    },
}

impl Operation {
    /// Check that `entry` carries what its kind requires.
    pub(crate) fn validate(index: usize, entry: BatchEntry) -> crate::Result<Self> {
        let Some(id) = entry.key else {
            return Err(crate::Error::malformed(index, "missing key"));
        };
        match entry.kind {
            OpKind::Put => match entry.value {
                Some(value) => Ok(Self::Put {
                    id,
                    value,
                    fields: entry.fields,
                }),
                None => Err(crate::Error::malformed(index, "put without a value")),
            },
            OpKind::Del => Ok(Self::Del { id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use assert2::{check, let_assert};

    #[test]
    fn test_entries_from_json() {
        let entries: Vec<BatchEntry> = serde_json::from_str(
            r#"[
                {"type": "put", "key": "on990", "value": "on99"},
                {"type": "put", "key": "abc"},
                {"type": "del", "key": "167"},
                {"type": "put", "key": "c", "value": {"body": "x"}, "fields": ["body"]}
            ]"#,
        )
        .unwrap();
        check!(entries.len() == 4);
        check!(entries[0].key.as_deref() == Some(&b"on990"[..]));
        check!(entries[1].value.is_none());
        check!(entries[2].kind == OpKind::Del);
        check!(entries[3].fields.as_ref().is_some_and(|f| f.includes("body")));
    }

    #[test]
    fn test_validate() {
        let_assert!(Ok(Operation::Put { .. }) = Operation::validate(0, BatchEntry::put("a", "x")));
        let_assert!(Ok(Operation::Del { .. }) = Operation::validate(0, BatchEntry::del("a")));

        let mut missing_value = BatchEntry::put("abc", "x");
        missing_value.value = None;
        let_assert!(
            Err(Error::MalformedOperation { index: 1, .. }) =
                Operation::validate(1, missing_value)
        );

        let mut missing_key = BatchEntry::del("x");
        missing_key.key = None;
        let_assert!(Err(Error::MalformedOperation { .. }) = Operation::validate(2, missing_key));
    }
}
