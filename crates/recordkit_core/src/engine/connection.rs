//! Open database connections.

use crate::engine::factory::DatabaseShared;
use crate::engine::transaction::KvTransaction;
use crate::error::{CoreError, CoreResult};
use crate::types::TransactionMode;
use std::sync::Arc;

/// An open connection to one database at a fixed version.
///
/// The connection counts against the database's open connections until it
/// is closed or dropped; an upgrade cannot start while any are open.
pub struct KvConnection {
    db: Arc<DatabaseShared>,
    version: u64,
    store_names: Vec<String>,
    closed: bool,
}

impl KvConnection {
    pub(crate) fn new(db: Arc<DatabaseShared>, version: u64, store_names: Vec<String>) -> Self {
        db.connection_opened();
        Self {
            db,
            version,
            store_names,
            closed: false,
        }
    }

    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.db.name
    }

    /// Returns the version the connection was opened at.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the object store names, sorted.
    #[must_use]
    pub fn object_store_names(&self) -> &[String] {
        &self.store_names
    }

    /// Starts a transaction over `stores`.
    ///
    /// Suspends until the database grants the transaction: read-only
    /// transactions wait for any writer, read/write transactions wait for
    /// everyone.
    ///
    /// # Errors
    ///
    /// Fails on an empty or unknown scope, or for
    /// [`TransactionMode::VersionChange`], which only an upgrading open creates.
    pub async fn transaction(
        &self,
        stores: &[&str],
        mode: TransactionMode,
    ) -> CoreResult<KvTransaction> {
        if self.closed {
            return Err(CoreError::ConnectionClosed);
        }
        if stores.is_empty() {
            return Err(CoreError::invalid_state("transaction scope is empty"));
        }
        if let Some(missing) = stores
            .iter()
            .find(|name| !self.store_names.iter().any(|s| s == *name))
        {
            return Err(CoreError::not_found(*missing));
        }

        let scope = stores.iter().map(|s| (*s).to_string()).collect();
        let state = Arc::clone(&self.db.state);
        let tx = match mode {
            TransactionMode::ReadOnly => {
                KvTransaction::read(Arc::clone(&self.db), state.read_owned().await, scope)
            }
            TransactionMode::ReadWrite => {
                KvTransaction::read_write(Arc::clone(&self.db), state.write_owned().await, scope)
            }
            TransactionMode::VersionChange => {
                return Err(CoreError::invalid_state(
                    "version-change transactions are only created by open",
                ))
            }
        };
        Ok(tx)
    }

    /// Closes the connection.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.db.connection_closed();
            tracing::trace!(database = %self.db.name, "connection closed");
        }
    }
}

impl Drop for KvConnection {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for KvConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvConnection")
            .field("name", &self.db.name)
            .field("version", &self.version)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::KvFactory;
    use crate::types::StoreOptions;

    async fn open(factory: &KvFactory, version: u64) -> CoreResult<KvConnection> {
        factory
            .open("t", version, |tx, change| {
                if change.is_creation() {
                    tx.create_object_store("Todo", StoreOptions::auto_increment("key"))?;
                }
                Ok(())
            })
            .await
    }

    #[tokio::test]
    async fn closing_unblocks_upgrade() {
        let factory = KvFactory::in_memory();
        let conn = open(&factory, 1).await.unwrap();
        assert!(matches!(
            open(&factory, 2).await,
            Err(CoreError::Blocked { .. })
        ));

        conn.close();
        let upgraded = open(&factory, 2).await.unwrap();
        assert_eq!(upgraded.version(), 2);
        assert_eq!(upgraded.object_store_names(), ["Todo"]);
    }

    #[tokio::test]
    async fn drop_releases_connection() {
        let factory = KvFactory::in_memory();
        drop(open(&factory, 1).await.unwrap());
        assert!(open(&factory, 2).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_or_empty_scope() {
        let factory = KvFactory::in_memory();
        let conn = open(&factory, 1).await.unwrap();

        assert!(matches!(
            conn.transaction(&["Nope"], TransactionMode::ReadOnly).await,
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            conn.transaction(&[], TransactionMode::ReadOnly).await,
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            conn.transaction(&["Todo"], TransactionMode::VersionChange).await,
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn name_and_version() {
        let factory = KvFactory::in_memory();
        let conn = open(&factory, 3).await.unwrap();
        assert_eq!(conn.name(), "t");
        assert_eq!(conn.version(), 3);
    }
}
