//! Core type definitions.

use recordkit_codec::Value;
use std::fmt;

/// A store-generated record identity.
///
/// Keys produced by an auto-increment store start at 1, increase
/// monotonically and are never handed out twice, even after deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(pub u64);

impl Key {
    /// Creates a key.
    #[must_use]
    pub const fn new(key: u64) -> Self {
        Self(key)
    }

    /// Returns the raw key.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Reads a key out of a field value. Only non-negative integers qualify.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value
            .as_integer()
            .and_then(|n| u64::try_from(n).ok())
            .map(Self)
    }

    /// Converts the key to a field value.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn to_value(self) -> Value {
        Value::Integer(self.0 as i64)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Key> for u64 {
    fn from(key: Key) -> Self {
        key.0
    }
}

/// Access mode of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Shared; any number may run at once.
    ReadOnly,
    /// Exclusive; writes become visible on commit.
    ReadWrite,
    /// Exclusive; only created by an open that upgrades the version.
    VersionChange,
}

impl TransactionMode {
    /// Returns true if the mode permits writes.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::ReadWrite | Self::VersionChange)
    }
}

/// Version transition passed to an upgrade callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionChange {
    /// Stored version before the upgrade; 0 for a database that did not exist.
    pub old_version: u64,
    /// Version being opened.
    pub new_version: u64,
}

impl VersionChange {
    /// Returns true when the database did not exist before this upgrade.
    #[must_use]
    pub const fn is_creation(&self) -> bool {
        self.old_version == 0
    }
}

/// Parameters for a new object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Field holding each record's key.
    pub key_path: String,
    /// Whether missing keys are generated.
    pub auto_increment: bool,
}

impl StoreOptions {
    /// In-line keys at `key_path`, generated when missing.
    pub fn auto_increment(key_path: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
            auto_increment: true,
        }
    }

    /// In-line keys at `key_path` that callers must always supply.
    pub fn explicit(key_path: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
            auto_increment: false,
        }
    }
}
