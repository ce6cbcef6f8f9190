//! Object store handle.

use crate::engine::cursor::Cursor;
use crate::engine::log::LogOp;
use crate::engine::state::StoreData;
use crate::engine::transaction::KvTransaction;
use crate::error::{CoreError, CoreResult};
use crate::types::{Key, StoreOptions};
use recordkit_codec::Value;

/// One object store, seen through a transaction.
///
/// Reads observe the transaction's own uncommitted writes.
pub struct ObjectStore<'tx> {
    tx: &'tx mut KvTransaction,
    name: String,
}

impl<'tx> ObjectStore<'tx> {
    pub(crate) fn new(tx: &'tx mut KvTransaction, name: String) -> Self {
        Self { tx, name }
    }

    /// Returns the store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the key path and key generation setting.
    pub fn options(&self) -> CoreResult<&StoreOptions> {
        Ok(&self.require()?.options)
    }

    /// Inserts a new record and returns its key.
    ///
    /// A missing or null key field is generated when the store allows it
    /// and stamped into the stored record.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::Constraint`] if the key is already taken.
    pub fn add(&mut self, value: Value) -> CoreResult<Key> {
        self.write(value, false)
    }

    /// Inserts or replaces the record with the value's key.
    pub fn put(&mut self, value: Value) -> CoreResult<Key> {
        self.write(value, true)
    }

    /// Deletes the record under `key`. Deleting a missing key is not an error.
    pub fn delete(&mut self, key: Key) -> CoreResult<()> {
        let name = self.name.clone();
        let data = self.tx.store_data_mut(&name)?;
        if data.records.remove(&key).is_some() {
            self.tx.record_op(LogOp::Delete { store: name, key });
        }
        Ok(())
    }

    /// Removes every record. The key generator is left where it was.
    pub fn clear(&mut self) -> CoreResult<()> {
        let name = self.name.clone();
        self.tx.store_data_mut(&name)?.records.clear();
        self.tx.record_op(LogOp::Clear { store: name });
        Ok(())
    }

    /// Returns the record under `key`.
    pub fn get(&self, key: Key) -> CoreResult<Option<Value>> {
        Ok(self.require()?.records.get(&key).cloned())
    }

    /// Returns every record in ascending key order.
    pub fn get_all(&self) -> CoreResult<Vec<Value>> {
        Ok(self.require()?.records.values().cloned().collect())
    }

    /// Returns the number of records.
    #[must_use]
    pub fn count(&self) -> usize {
        self.data().map_or(0, |d| d.records.len())
    }

    /// Opens a cursor positioned before the lowest key.
    pub fn open_cursor(&self) -> CoreResult<Cursor<'_>> {
        Ok(Cursor::new(&self.require()?.records))
    }

    fn write(&mut self, mut value: Value, overwrite: bool) -> CoreResult<Key> {
        let name = self.name.clone();
        let data = self.tx.store_data_mut(&name)?;
        let key = data.key_for(&mut value)?;
        if !overwrite && data.records.contains_key(&key) {
            return Err(CoreError::duplicate_key(&name, key));
        }
        data.insert(key, value.clone());
        self.tx.record_op(LogOp::Put {
            store: name,
            key,
            value,
        });
        Ok(key)
    }

    fn data(&self) -> Option<&StoreData> {
        self.tx.store_data(&self.name)
    }

    fn require(&self) -> CoreResult<&StoreData> {
        self.data().ok_or_else(|| CoreError::not_found(&self.name))
    }
}

impl std::fmt::Debug for ObjectStore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("name", &self.name)
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{KvConnection, KvFactory};
    use crate::types::TransactionMode;

    async fn open(factory: &KvFactory) -> KvConnection {
        factory
            .open("t", 1, |tx, _| {
                tx.create_object_store("Todo", StoreOptions::auto_increment("key"))?;
                tx.create_object_store("Tag", StoreOptions::explicit("key"))
            })
            .await
            .unwrap()
    }

    fn task(text: &str) -> Value {
        Value::from_fields([("text", text)])
    }

    #[tokio::test]
    async fn add_generates_increasing_keys() {
        let factory = KvFactory::in_memory();
        let conn = open(&factory).await;
        let mut tx = conn
            .transaction(&["Todo"], TransactionMode::ReadWrite)
            .await
            .unwrap();
        let mut store = tx.object_store("Todo").unwrap();

        assert_eq!(store.add(task("a")).unwrap(), Key::new(1));
        assert_eq!(store.add(task("b")).unwrap(), Key::new(2));

        let stored = store.get(Key::new(2)).unwrap().unwrap();
        assert_eq!(stored.get("key"), Some(&Value::Integer(2)));
        assert_eq!(stored.get("text"), Some(&Value::from("b")));
    }

    #[tokio::test]
    async fn keys_not_reused_after_delete() {
        let factory = KvFactory::in_memory();
        let conn = open(&factory).await;
        let mut tx = conn
            .transaction(&["Todo"], TransactionMode::ReadWrite)
            .await
            .unwrap();
        let mut store = tx.object_store("Todo").unwrap();

        let first = store.add(task("a")).unwrap();
        store.delete(first).unwrap();
        assert_eq!(store.add(task("b")).unwrap(), Key::new(2));
    }

    #[tokio::test]
    async fn add_rejects_taken_key() {
        let factory = KvFactory::in_memory();
        let conn = open(&factory).await;
        let mut tx = conn
            .transaction(&["Todo"], TransactionMode::ReadWrite)
            .await
            .unwrap();
        let mut store = tx.object_store("Todo").unwrap();

        store.add(task("a")).unwrap();
        let err = store
            .add(Value::from_fields([("key", Value::Integer(1)), ("text", "b".into())]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Constraint { .. }));
    }

    #[tokio::test]
    async fn put_replaces_by_key() {
        let factory = KvFactory::in_memory();
        let conn = open(&factory).await;
        let mut tx = conn
            .transaction(&["Todo"], TransactionMode::ReadWrite)
            .await
            .unwrap();
        let mut store = tx.object_store("Todo").unwrap();

        let key = store.add(task("a")).unwrap();
        store
            .put(Value::from_fields([("key", key.to_value()), ("text", "z".into())]))
            .unwrap();

        assert_eq!(store.count(), 1);
        let all = store.get_all().unwrap();
        assert_eq!(all[0].get("text"), Some(&Value::from("z")));
    }

    #[tokio::test]
    async fn explicit_keys_required_without_generator() {
        let factory = KvFactory::in_memory();
        let conn = open(&factory).await;
        let mut tx = conn
            .transaction(&["Tag"], TransactionMode::ReadWrite)
            .await
            .unwrap();
        let mut store = tx.object_store("Tag").unwrap();

        assert!(store.add(task("a")).is_err());
        assert_eq!(
            store
                .add(Value::from_fields([("key", 40i64)]))
                .unwrap(),
            Key::new(40)
        );
        assert!(!store.options().unwrap().auto_increment);
    }

    #[tokio::test]
    async fn get_all_in_key_order() {
        let factory = KvFactory::in_memory();
        let conn = open(&factory).await;
        let mut tx = conn
            .transaction(&["Todo"], TransactionMode::ReadWrite)
            .await
            .unwrap();
        let mut store = tx.object_store("Todo").unwrap();

        store
            .put(Value::from_fields([("key", Value::Integer(5)), ("text", "five".into())]))
            .unwrap();
        store.add(task("six")).unwrap();
        store
            .put(Value::from_fields([("key", Value::Integer(2)), ("text", "two".into())]))
            .unwrap();

        let texts: Vec<_> = store
            .get_all()
            .unwrap()
            .iter()
            .map(|r| r.get("text").and_then(Value::as_text).unwrap().to_string())
            .collect();
        assert_eq!(texts, ["two", "five", "six"]);
    }

    #[tokio::test]
    async fn clear_and_delete_missing() {
        let factory = KvFactory::in_memory();
        let conn = open(&factory).await;
        let mut tx = conn
            .transaction(&["Todo"], TransactionMode::ReadWrite)
            .await
            .unwrap();
        let mut store = tx.object_store("Todo").unwrap();

        store.add(task("a")).unwrap();
        store.delete(Key::new(99)).unwrap();
        store.clear().unwrap();
        assert_eq!(store.count(), 0);
        assert_eq!(store.add(task("b")).unwrap(), Key::new(2));
    }
}
