//! Cursor scans over an object store.
//!
//! All scans walk records in ascending key order. [`find_one`] and
//! [`find_all`] test records with [`Query::matches`], so a record is taken
//! as soon as any single term holds, and an empty query takes nothing.

use crate::engine::ObjectStore;
use crate::error::CoreResult;
use crate::query::Query;
use recordkit_codec::Value;

/// Returns every record with one bulk read.
pub async fn get_all(store: &ObjectStore<'_>) -> CoreResult<Vec<Value>> {
    store.get_all()
}

/// Returns the first record matching `query`.
pub async fn find_one(store: &ObjectStore<'_>, query: &Query) -> CoreResult<Option<Value>> {
    let mut cursor = store.open_cursor()?;
    while let Some((_, record)) = cursor.advance().await {
        if query.matches(record) {
            return Ok(Some(record.clone()));
        }
    }
    Ok(None)
}

/// Returns every record matching `query`, each at most once.
pub async fn find_all(store: &ObjectStore<'_>, query: &Query) -> CoreResult<Vec<Value>> {
    let mut found = Vec::new();
    let mut cursor = store.open_cursor()?;
    while let Some((_, record)) = cursor.advance().await {
        if query.matches(record) {
            found.push(record.clone());
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{KvConnection, KvFactory};
    use crate::types::{StoreOptions, TransactionMode};

    async fn seeded() -> (KvFactory, KvConnection) {
        let factory = KvFactory::in_memory();
        let conn = factory
            .open("t", 1, |tx, _| {
                tx.create_object_store("Todo", StoreOptions::auto_increment("key"))
            })
            .await
            .unwrap();
        {
            let mut tx = conn
                .transaction(&["Todo"], TransactionMode::ReadWrite)
                .await
                .unwrap();
            let mut store = tx.object_store("Todo").unwrap();
            for (id, text, done) in [("a", "milk", false), ("b", "eggs", true), ("c", "milk", true)] {
                store
                    .add(Value::from_fields([
                        ("id", Value::from(id)),
                        ("text", text.into()),
                        ("isDone", done.into()),
                    ]))
                    .unwrap();
            }
            tx.commit().await.unwrap();
        }
        (factory, conn)
    }

    fn ids(records: &[Value]) -> Vec<&str> {
        records
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_text))
            .collect()
    }

    #[tokio::test]
    async fn find_one_returns_first_in_key_order() {
        let (_factory, conn) = seeded().await;
        let mut tx = conn
            .transaction(&["Todo"], TransactionMode::ReadOnly)
            .await
            .unwrap();
        let store = tx.object_store("Todo").unwrap();

        let found = find_one(&store, &Query::new().eq("text", "milk"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("id"), Some(&Value::from("a")));

        assert!(find_one(&store, &Query::new().eq("id", "zz"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn find_all_uses_or_semantics() {
        let (_factory, conn) = seeded().await;
        let mut tx = conn
            .transaction(&["Todo"], TransactionMode::ReadOnly)
            .await
            .unwrap();
        let store = tx.object_store("Todo").unwrap();

        let query = Query::new().eq("id", "a").eq("isDone", true);
        let found = find_all(&store, &query).await.unwrap();
        assert_eq!(ids(&found), ["a", "b", "c"]);

        // "c" matches both terms but appears once.
        let query = Query::new().eq("id", "c").eq("text", "milk");
        let found = find_all(&store, &query).await.unwrap();
        assert_eq!(ids(&found), ["a", "c"]);
    }

    #[tokio::test]
    async fn empty_query_finds_nothing() {
        let (_factory, conn) = seeded().await;
        let mut tx = conn
            .transaction(&["Todo"], TransactionMode::ReadOnly)
            .await
            .unwrap();
        let store = tx.object_store("Todo").unwrap();

        assert!(find_all(&store, &Query::new()).await.unwrap().is_empty());
        assert!(find_one(&store, &Query::new()).await.unwrap().is_none());
        assert_eq!(get_all(&store).await.unwrap().len(), 3);
    }
}
