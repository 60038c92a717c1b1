//! Error handling types and utilities.

/// A specialized Result type for kvsearch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the index, the pipeline and the store layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value references one of its own ancestors.
    #[error("Cycle detected")]
    Cycle,

    /// A batch entry is missing something its operation type requires.
    #[error("Malformed batch operation at index {index}: {reason}")]
    MalformedOperation { index: usize, reason: String },

    /// Read of an absent document id or metadata key.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Passthrough from the underlying store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored record could not be decoded.
    #[error("Corrupt record: {0}")]
    Codec(String),

    /// The supplied transaction belongs to a different database.
    #[error("Transaction was opened on a different database")]
    TransactionMismatch,

    /// An earlier staging failure poisoned the transaction.
    #[error("Transaction aborted by an earlier failure")]
    TransactionAborted,

    /// Configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The task running a write panicked or was shut down with its runtime.
    #[error("Write task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

impl Error {
    /// Whether this is the expected negative result of a lookup.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedOperation {
            index,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

impl From<postcard::Error> for Error {
    fn from(err: postcard::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Opaque failure reported by a [`Store`](crate::store::Store) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store snapshot is unreadable: {0}")]
    Snapshot(#[from] postcard::Error),

    #[error("Store background task failed: {0}")]
    Task(String),

    #[error("{0}")]
    Backend(String),
}
