//! Document values accepted by the write path.
//!
//! Arrays and objects live behind shared [`Node`]s so callers can build
//! graphs that reference themselves. Every traversal tracks the identities
//! of the nodes on the current path and fails with [`Error::Cycle`] when it
//! would re-enter one of them; a node reached twice through different
//! branches is not a cycle.

use crate::error::{Error, Result};
use ahash::AHashSet;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Deserialize;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Identities of the nodes on the path currently being walked.
pub(crate) type Ancestors = AHashSet<usize>;

/// A shared, mutable container node.
pub struct Node<T>(Arc<RwLock<T>>);

impl<T> Node<T> {
    pub fn new(inner: T) -> Self {
        Self(Arc::new(RwLock::new(inner)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Run `f` over the node contents with the node registered as an ancestor.
    pub(crate) fn enter<R>(
        &self,
        ancestors: &mut Ancestors,
        f: impl FnOnce(&T, &mut Ancestors) -> Result<R>,
    ) -> Result<R> {
        let id = self.identity();
        if !ancestors.insert(id) {
            return Err(Error::Cycle);
        }
        let result = {
            let guard = self.0.read();
            f(&guard, ancestors)
        };
        ancestors.remove(&id);
        result
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

// Contents are not printed: a node may contain itself.
impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({:#x})", self.identity())
    }
}

/// An arbitrary document value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    /// Raw bytes; decoded to text when indexed or stored.
    Bytes(Vec<u8>),
    Array(Node<Vec<Value>>),
    Object(Node<BTreeMap<String, Value>>),
}

impl Value {
    /// Build an object node from key/value pairs.
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Self>,
    {
        Self::Object(Node::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// Build an array node.
    pub fn array<V: Into<Self>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::Array(Node::new(items.into_iter().map(Into::into).collect()))
    }

    /// Set `key` on an object value. Returns `false` for non-objects.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Self>) -> bool {
        match self {
            Self::Object(node) => {
                node.write().insert(key.into(), value.into());
                true
            }
            _ => false,
        }
    }

    /// Append to an array value. Returns `false` for non-arrays.
    pub fn push(&self, value: impl Into<Self>) -> bool {
        match self {
            Self::Array(node) => {
                node.write().push(value.into());
                true
            }
            _ => false,
        }
    }

    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Visit every text leaf depth-first, in traversal order.
    ///
    /// Numbers, booleans and nulls are skipped. Bytes are decoded lossily.
    pub(crate) fn visit_text<F: FnMut(&str)>(
        &self,
        ancestors: &mut Ancestors,
        f: &mut F,
    ) -> Result<()> {
        match self {
            Self::Text(text) => f(text.as_str()),
            Self::Bytes(bytes) => f(&String::from_utf8_lossy(bytes)),
            Self::Array(node) => node.enter(ancestors, |items, ancestors| {
                items
                    .iter()
                    .try_for_each(|item| item.visit_text(&mut *ancestors, &mut *f))
            })?,
            Self::Object(node) => node.enter(ancestors, |entries, ancestors| {
                entries
                    .values()
                    .try_for_each(|item| item.visit_text(&mut *ancestors, &mut *f))
            })?,
            Self::Null | Self::Bool(_) | Self::Number(_) => {}
        }
        Ok(())
    }

    /// Convert to plain JSON, decoding bytes to strings.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.to_json_in(&mut Ancestors::default())
    }

    fn to_json_in(&self, ancestors: &mut Ancestors) -> Result<serde_json::Value> {
        Ok(match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Bytes(bytes) => {
                serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
            }
            Self::Array(node) => node.enter(ancestors, |items, ancestors| {
                items
                    .iter()
                    .map(|item| item.to_json_in(&mut *ancestors))
                    .collect::<Result<Vec<_>>>()
                    .map(serde_json::Value::Array)
            })?,
            Self::Object(node) => node.enter(ancestors, |entries, ancestors| {
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json_in(&mut *ancestors)?)))
                    .collect::<Result<serde_json::Map<_, _>>>()
                    .map(serde_json::Value::Object)
            })?,
        })
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => Self::array(items),
            serde_json::Value::Object(entries) => Self::object(entries),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::Array(Node::new(items))
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Self::array(items)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(Self::Null, Self::Number)
    }
}

impl<V: Into<Self>> From<Option<V>> for Value {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
