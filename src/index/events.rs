//! Notifications of committed writes.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Kind of write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Put,
    #[serde(alias = "delete")]
    Del,
}

/// A committed put or delete.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: OpKind,
    /// Document id.
    pub key: Vec<u8>,
    /// The stored value for puts; `None` for deletes.
    pub value: Option<serde_json::Value>,
}

/// One broadcast channel per operation kind.
#[derive(Debug, Clone)]
pub(crate) struct Events {
    put: broadcast::Sender<Event>,
    del: broadcast::Sender<Event>,
}

impl Events {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            put: broadcast::channel(capacity).0,
            del: broadcast::channel(capacity).0,
        }
    }

    const fn sender(&self, kind: OpKind) -> &broadcast::Sender<Event> {
        match kind {
            OpKind::Put => &self.put,
            OpKind::Del => &self.del,
        }
    }

    pub(crate) fn subscribe(&self, kind: OpKind) -> broadcast::Receiver<Event> {
        self.sender(kind).subscribe()
    }

    pub(crate) fn emit(&self, event: Event) {
        // Sending only fails when nobody is listening.
        if self.sender(event.kind).send(event).is_err() {
            tracing::trace!("No subscribers for committed write");
        }
    }
}
