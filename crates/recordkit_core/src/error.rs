//! Error types for recordkit core.

use crate::types::Key;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the key/value engine and the connection layer.
///
/// The record store never returns these; it logs them and degrades to an
/// empty result.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] recordkit_storage::StorageError),

    /// CBOR codec or serde conversion error.
    #[error("codec error: {0}")]
    Codec(#[from] recordkit_codec::CodecError),

    /// I/O error outside a storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Version 0 was requested.
    #[error("invalid database version {version}: versions start at 1")]
    InvalidVersion {
        /// The rejected version.
        version: u64,
    },

    /// The requested version is lower than the stored one.
    #[error("database {name} is at version {stored}, cannot open at version {requested}")]
    VersionError {
        /// Database name.
        name: String,
        /// Version asked for.
        requested: u64,
        /// Version on disk.
        stored: u64,
    },

    /// An upgrade was needed while other connections were open.
    #[error("database {name} is blocked by {open} open connection(s)")]
    Blocked {
        /// Database name.
        name: String,
        /// Connections that must close first.
        open: usize,
    },

    /// Object store does not exist.
    #[error("object store not found: {name}")]
    NotFound {
        /// Name of the object store.
        name: String,
    },

    /// Object store is not part of the transaction's scope.
    #[error("object store {name} is outside the transaction scope")]
    OutOfScope {
        /// Name of the object store.
        name: String,
    },

    /// An `add` hit an existing key, or a store was created twice.
    #[error("constraint violation: {message}")]
    Constraint {
        /// What collided.
        message: String,
    },

    /// A write was attempted in a read-only transaction.
    #[error("transaction on {store} is read-only")]
    ReadOnly {
        /// Target store.
        store: String,
    },

    /// A value could not be keyed.
    #[error("data error: {message}")]
    Data {
        /// Why the value was rejected.
        message: String,
    },

    /// Operation not allowed in the current state.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the state problem.
        message: String,
    },

    /// Connection was closed before use.
    #[error("connection is closed")]
    ConnectionClosed,

    /// A committed log entry failed validation during replay.
    #[error("log corruption: {message}")]
    LogCorruption {
        /// Description of the corruption.
        message: String,
    },
}

impl CoreError {
    /// Creates a not-found error for an object store.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates a constraint error for a duplicate key.
    pub fn duplicate_key(store: &str, key: Key) -> Self {
        Self::Constraint {
            message: format!("key {key} already exists in {store}"),
        }
    }

    /// Creates a data error.
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a log corruption error.
    pub fn log_corruption(message: impl Into<String>) -> Self {
        Self::LogCorruption {
            message: message.into(),
        }
    }
}
