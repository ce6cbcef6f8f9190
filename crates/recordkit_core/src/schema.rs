//! Schema registry: which collections a store declares.

use crate::engine::KvTransaction;
use crate::error::CoreResult;
use crate::types::{StoreOptions, VersionChange};

/// Highest database version whose upgrade still creates collections.
///
/// Later versions are reserved for migrations, which are not implemented.
pub const SCHEMA_CREATION_VERSION: u64 = 1;

/// Environment variable overriding [`SchemaConfig::db_name`].
pub const DB_NAME_ENV: &str = "RECORDKIT_DB_NAME";

/// Environment variable overriding [`SchemaConfig::db_version`].
pub const DB_VERSION_ENV: &str = "RECORDKIT_DB_VERSION";

/// Name, version and collections of a record database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaConfig {
    /// Database name.
    pub db_name: String,
    /// Version requested on every connect.
    pub db_version: u64,
    /// Collections to create on first open.
    pub collections: Vec<String>,
    /// Field holding each record's generated key.
    pub key_path: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            db_name: "myidb".to_string(),
            db_version: 1,
            collections: Vec::new(),
            key_path: "key".to_string(),
        }
    }
}

impl SchemaConfig {
    /// Creates a schema with default name and version and no collections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database name.
    #[must_use]
    pub fn db_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = name.into();
        self
    }

    /// Sets the database version.
    #[must_use]
    pub fn db_version(mut self, version: u64) -> Self {
        self.db_version = version;
        self
    }

    /// Declares a collection. Declaring the same name twice has no effect.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.collections.contains(&name) {
            self.collections.push(name);
        }
        self
    }

    /// Sets the key field name.
    #[must_use]
    pub fn key_path(mut self, path: impl Into<String>) -> Self {
        self.key_path = path.into();
        self
    }

    /// Applies `RECORDKIT_DB_NAME` and `RECORDKIT_DB_VERSION` if set.
    ///
    /// An unparsable version is ignored with a warning.
    #[must_use]
    pub fn from_env(self) -> Self {
        self.with_overrides(
            std::env::var(DB_NAME_ENV).ok(),
            std::env::var(DB_VERSION_ENV).ok(),
        )
    }

    fn with_overrides(mut self, name: Option<String>, version: Option<String>) -> Self {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.db_name = name;
        }
        if let Some(raw) = version {
            match raw.trim().parse::<u64>() {
                Ok(v) if v > 0 => self.db_version = v,
                _ => tracing::warn!(
                    value = %raw,
                    "ignoring invalid {DB_VERSION_ENV}, keeping version {}",
                    self.db_version
                ),
            }
        }
        self
    }

    /// Returns true if `name` is a declared collection.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.collections.iter().any(|c| c == name)
    }

    /// Upgrade callback: creates every declared collection not yet present.
    ///
    /// Only upgrades to a version up to [`SCHEMA_CREATION_VERSION`] create
    /// anything; later versions are logged and left alone.
    pub(crate) fn upgrade(&self, tx: &mut KvTransaction, change: VersionChange) -> CoreResult<()> {
        if change.new_version > SCHEMA_CREATION_VERSION {
            tracing::warn!(
                database = %self.db_name,
                old_version = change.old_version,
                new_version = change.new_version,
                "no schema changes defined for this version"
            );
            return Ok(());
        }

        let existing = tx.object_store_names();
        for name in &self.collections {
            if !existing.contains(name) {
                tx.create_object_store(name, StoreOptions::auto_increment(self.key_path.as_str()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::KvFactory;

    #[test]
    fn defaults() {
        let schema = SchemaConfig::default();
        assert_eq!(schema.db_name, "myidb");
        assert_eq!(schema.db_version, 1);
        assert_eq!(schema.key_path, "key");
        assert!(schema.collections.is_empty());
    }

    #[test]
    fn builder_pattern() {
        let schema = SchemaConfig::new()
            .db_name("tasks")
            .db_version(2)
            .collection("Group")
            .collection("Todo")
            .collection("Todo")
            .key_path("id");
        assert_eq!(schema.db_name, "tasks");
        assert_eq!(schema.db_version, 2);
        assert_eq!(schema.collections, ["Group", "Todo"]);
        assert_eq!(schema.key_path, "id");
        assert!(schema.declares("Todo"));
        assert!(!schema.declares("Note"));
    }

    #[test]
    fn overrides() {
        let schema = SchemaConfig::new().with_overrides(Some("other".into()), Some("3".into()));
        assert_eq!(schema.db_name, "other");
        assert_eq!(schema.db_version, 3);

        let schema = SchemaConfig::new().with_overrides(Some(String::new()), Some("zero".into()));
        assert_eq!(schema.db_name, "myidb");
        assert_eq!(schema.db_version, 1);

        let schema = SchemaConfig::new().with_overrides(None, Some("0".into()));
        assert_eq!(schema.db_version, 1);
    }

    #[tokio::test]
    async fn creation_pass_creates_declared_collections() {
        let schema = SchemaConfig::new().collection("Group").collection("Todo");
        let factory = KvFactory::in_memory();
        let conn = factory
            .open(&schema.db_name, schema.db_version, |tx, change| {
                schema.upgrade(tx, change)
            })
            .await
            .unwrap();
        assert_eq!(conn.object_store_names(), ["Group", "Todo"]);
    }

    #[tokio::test]
    async fn later_versions_create_nothing() {
        let schema = SchemaConfig::new().db_version(2).collection("Todo");
        let factory = KvFactory::in_memory();
        let conn = factory
            .open(&schema.db_name, schema.db_version, |tx, change| {
                schema.upgrade(tx, change)
            })
            .await
            .unwrap();
        assert_eq!(conn.version(), 2);
        assert!(conn.object_store_names().is_empty());
    }
}
