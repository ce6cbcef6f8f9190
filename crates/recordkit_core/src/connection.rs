//! Connection manager.

use crate::engine::{KvConnection, KvFactory};
use crate::error::CoreResult;
use crate::schema::SchemaConfig;
use std::sync::Arc;

/// Opens connections to the schema's database, creating collections on
/// first open.
///
/// Cloning is cheap; clones share the factory and schema.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    factory: Arc<KvFactory>,
    schema: Arc<SchemaConfig>,
}

impl ConnectionManager {
    /// Creates a manager over `factory` for `schema`.
    pub fn new(factory: Arc<KvFactory>, schema: SchemaConfig) -> Self {
        Self {
            factory,
            schema: Arc::new(schema),
        }
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    /// Opens a connection, or logs why it could not and returns `None`.
    pub async fn connect(&self) -> Option<KvConnection> {
        match self.try_connect().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::error!(
                    database = %self.schema.db_name,
                    version = self.schema.db_version,
                    error = %e,
                    "failed to open database"
                );
                None
            }
        }
    }

    /// Opens a connection, running the schema's creation pass if needed.
    pub async fn try_connect(&self) -> CoreResult<KvConnection> {
        let schema = Arc::clone(&self.schema);
        self.factory
            .open(&schema.db_name, schema.db_version, |tx, change| {
                schema.upgrade(tx, change)
            })
            .await
    }
}
