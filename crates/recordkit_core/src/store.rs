//! Typed record stores.
//!
//! Every operation opens its own connection, runs one transaction and
//! closes the connection again, whatever the outcome. Failures never reach
//! the caller: they are logged and the operation returns its empty value
//! (`[]`, `None` or `0`). Use [`ConnectionManager::try_connect`] and the
//! engine directly when errors must be told apart from "not found".

use crate::connection::ConnectionManager;
use crate::engine::{KvConnection, KvFactory};
use crate::error::{CoreError, CoreResult};
use crate::query::Query;
use crate::scan;
use crate::schema::SchemaConfig;
use crate::types::{Key, TransactionMode};
use recordkit_codec::{from_value, to_value, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

/// A database of collections described by a [`SchemaConfig`].
///
/// # Example
///
/// ```
/// use recordkit_core::{Query, SchemaConfig, Store};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Note {
///     #[serde(default, skip_serializing_if = "Option::is_none")]
///     key: Option<u64>,
///     text: String,
/// }
///
/// # tokio_test(async {
/// let store = Store::in_memory(SchemaConfig::new().collection("Note"));
/// let notes = store.collection::<Note>("Note");
///
/// let added = notes.add(&Note { key: None, text: "hello".into() }).await.unwrap();
/// assert_eq!(added.key, Some(1));
/// assert_eq!(notes.find_all(None).await.len(), 1);
/// # });
/// # fn tokio_test(f: impl std::future::Future<Output = ()>) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    manager: ConnectionManager,
}

impl Store {
    /// Creates a store over `factory`.
    pub fn new(factory: KvFactory, schema: SchemaConfig) -> Self {
        Self {
            manager: ConnectionManager::new(Arc::new(factory), schema),
        }
    }

    /// Creates a store that keeps everything in memory.
    pub fn in_memory(schema: SchemaConfig) -> Self {
        Self::new(KvFactory::in_memory(), schema)
    }

    /// Creates a store persisting its database under `dir`.
    pub fn open(dir: impl AsRef<Path>, schema: SchemaConfig) -> CoreResult<Self> {
        Ok(Self::new(KvFactory::with_directory(dir)?, schema))
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &SchemaConfig {
        self.manager.schema()
    }

    /// Returns a typed handle on the collection `name`.
    ///
    /// Undeclared collections are accepted but every operation on them
    /// fails and returns its empty value.
    pub fn collection<T>(&self, name: impl Into<String>) -> RecordStore<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let name = name.into();
        if !self.schema().declares(&name) {
            tracing::warn!(collection = %name, "collection is not declared in the schema");
        }
        RecordStore {
            manager: self.manager.clone(),
            collection: name,
            _marker: PhantomData,
        }
    }
}

/// CRUD access to one collection of `T` records.
pub struct RecordStore<T> {
    manager: ConnectionManager,
    collection: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordStore<T> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            collection: self.collection.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for RecordStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl<T> RecordStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Returns the collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.collection
    }

    /// Returns every record, or those matching `query`, in key order.
    pub async fn find_all(&self, query: Option<&Query>) -> Vec<T> {
        let Some(conn) = self.manager.connect().await else {
            return Vec::new();
        };
        let result = self.read_all(&conn, query).await;
        conn.close();
        self.settle("find_all", result)
    }

    /// Returns the first record matching `query`.
    pub async fn find(&self, query: &Query) -> Option<T> {
        let conn = self.manager.connect().await?;
        let result = self.read_one(&conn, query).await;
        conn.close();
        self.settle("find", result)
    }

    /// Inserts `record` and returns it with its generated key stamped in.
    pub async fn add(&self, record: &T) -> Option<T> {
        let conn = self.manager.connect().await?;
        let result = self.insert(&conn, record).await.map(Some);
        conn.close();
        self.settle("add", result)
    }

    /// Merges the fields of `partial` into the first record matching `query`.
    ///
    /// Fields of `partial` overwrite or extend the record; other fields are
    /// kept. The record keeps its key. Returns `None` when nothing matches;
    /// update never inserts.
    pub async fn update<P>(&self, query: &Query, partial: &P) -> Option<T>
    where
        P: Serialize + ?Sized,
    {
        let conn = self.manager.connect().await?;
        let result = self.merge(&conn, query, partial).await;
        conn.close();
        self.settle("update", result)
    }

    /// Deletes the first record matching `query` and returns its key, or 0
    /// if nothing matched.
    pub async fn remove(&self, query: &Query) -> u64 {
        let Some(conn) = self.manager.connect().await else {
            return 0;
        };
        let result = self.delete(&conn, query).await;
        conn.close();
        self.settle("remove", result)
    }

    fn key_path(&self) -> &str {
        &self.manager.schema().key_path
    }

    fn settle<R: Default>(&self, op: &'static str, result: CoreResult<R>) -> R {
        result.unwrap_or_else(|e| {
            tracing::error!(collection = %self.collection, op, error = %e, "record store operation failed");
            R::default()
        })
    }

    async fn read_all(&self, conn: &KvConnection, query: Option<&Query>) -> CoreResult<Vec<T>> {
        let mut tx = conn
            .transaction(&[self.collection.as_str()], TransactionMode::ReadOnly)
            .await?;
        let store = tx.object_store(&self.collection)?;
        let records = match query {
            None => scan::get_all(&store).await?,
            Some(query) => scan::find_all(&store, query).await?,
        };
        tx.commit().await?;
        records.iter().map(decode).collect()
    }

    async fn read_one(&self, conn: &KvConnection, query: &Query) -> CoreResult<Option<T>> {
        let mut tx = conn
            .transaction(&[self.collection.as_str()], TransactionMode::ReadOnly)
            .await?;
        let store = tx.object_store(&self.collection)?;
        let record = scan::find_one(&store, query).await?;
        tx.commit().await?;
        record.as_ref().map(decode).transpose()
    }

    async fn insert(&self, conn: &KvConnection, record: &T) -> CoreResult<T> {
        let mut value = to_value(record)?;
        let mut tx = conn
            .transaction(&[self.collection.as_str()], TransactionMode::ReadWrite)
            .await?;
        let mut store = tx.object_store(&self.collection)?;
        let key = store.add(value.clone())?;
        value.insert(self.key_path(), key.to_value());
        let stamped = decode(&value)?;
        tx.commit().await?;
        tracing::debug!(collection = %self.collection, %key, "record added");
        Ok(stamped)
    }

    async fn merge<P>(&self, conn: &KvConnection, query: &Query, partial: &P) -> CoreResult<Option<T>>
    where
        P: Serialize + ?Sized,
    {
        let patch = to_value(partial)?;
        if !patch.is_map() {
            return Err(CoreError::data("update patch must serialize to a map"));
        }

        let mut tx = conn
            .transaction(&[self.collection.as_str()], TransactionMode::ReadWrite)
            .await?;
        let mut store = tx.object_store(&self.collection)?;
        let Some(mut record) = scan::find_one(&store, query).await? else {
            return Ok(None);
        };
        let Some(key) = self.key_of(&record) else {
            return Ok(None);
        };

        for (field, value) in patch.fields() {
            record.insert(field, value.clone());
        }
        record.insert(self.key_path(), key.to_value());

        let merged = decode(&record)?;
        store.put(record)?;
        tx.commit().await?;
        tracing::debug!(collection = %self.collection, %key, "record updated");
        Ok(Some(merged))
    }

    async fn delete(&self, conn: &KvConnection, query: &Query) -> CoreResult<u64> {
        let mut tx = conn
            .transaction(&[self.collection.as_str()], TransactionMode::ReadWrite)
            .await?;
        let mut store = tx.object_store(&self.collection)?;
        let Some(key) = scan::find_one(&store, query)
            .await?
            .and_then(|record| self.key_of(&record))
        else {
            return Ok(0);
        };

        store.delete(key)?;
        tx.commit().await?;
        tracing::debug!(collection = %self.collection, %key, "record removed");
        Ok(key.as_u64())
    }

    fn key_of(&self, record: &Value) -> Option<Key> {
        record.get(self.key_path()).and_then(Key::from_value)
    }
}

fn decode<T: DeserializeOwned>(record: &Value) -> CoreResult<T> {
    Ok(from_value(record)?)
}
