//! Database factory: opening, upgrading and deleting databases.

use crate::config::EngineConfig;
use crate::engine::connection::KvConnection;
use crate::engine::log::{self, LogOp};
use crate::engine::state::DatabaseState;
use crate::engine::transaction::KvTransaction;
use crate::error::{CoreError, CoreResult};
use crate::types::{TransactionMode, VersionChange};
use parking_lot::Mutex;
use recordkit_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything connections and transactions share about one database.
pub(crate) struct DatabaseShared {
    pub(crate) name: String,
    pub(crate) state: Arc<RwLock<DatabaseState>>,
    backend: Mutex<Box<dyn StorageBackend>>,
    open_connections: AtomicUsize,
    /// Set once the database has been deleted and dropped from the cache.
    deleted: AtomicBool,
    sync_on_commit: bool,
}

impl DatabaseShared {
    fn load(
        name: &str,
        mut backend: Box<dyn StorageBackend>,
        config: &EngineConfig,
    ) -> CoreResult<Self> {
        let data = backend.read_all()?;
        let replay = log::replay(&data)?;
        if replay.valid_len < data.len() as u64 {
            tracing::warn!(
                database = name,
                dropped = data.len() as u64 - replay.valid_len,
                "discarding torn commit at end of log"
            );
            backend.truncate(replay.valid_len)?;
        }
        tracing::debug!(
            database = name,
            version = replay.state.version,
            entries = replay.entries,
            "database loaded"
        );

        Ok(Self {
            name: name.to_string(),
            state: Arc::new(RwLock::new(replay.state)),
            backend: Mutex::new(backend),
            open_connections: AtomicUsize::new(0),
            deleted: AtomicBool::new(false),
            sync_on_commit: config.sync_on_commit,
        })
    }

    /// Appends one committed transaction to the log.
    pub(crate) fn append(&self, ops: &[LogOp]) -> CoreResult<()> {
        let entry = log::encode_entry(ops)?;
        let mut backend = self.backend.lock();
        backend.append(&entry)?;
        if self.sync_on_commit {
            backend.sync()?;
        }
        Ok(())
    }

    pub(crate) fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::Acquire)
    }

    pub(crate) fn connection_opened(&self) {
        self.open_connections.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn connection_closed(&self) {
        self.open_connections.fetch_sub(1, Ordering::AcqRel);
    }

    fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }
}

enum Location {
    Memory,
    Directory(PathBuf),
}

/// Opens named, versioned databases.
///
/// A factory is either purely in memory or backed by a directory holding
/// one log file per database. Each database is loaded once and shared by
/// every connection the factory hands out.
pub struct KvFactory {
    location: Location,
    config: EngineConfig,
    databases: Mutex<HashMap<String, Arc<DatabaseShared>>>,
}

impl KvFactory {
    /// Creates a factory whose databases live only as long as it does.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_config(Location::Memory, EngineConfig::default())
    }

    /// Creates a factory storing databases under `dir`.
    pub fn with_directory(dir: impl AsRef<Path>) -> CoreResult<Self> {
        Self::with_directory_and_config(dir, EngineConfig::default())
    }

    /// Creates a directory-backed factory with explicit configuration.
    pub fn with_directory_and_config(
        dir: impl AsRef<Path>,
        config: EngineConfig,
    ) -> CoreResult<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self::with_config(
            Location::Directory(dir.as_ref().to_path_buf()),
            config,
        ))
    }

    fn with_config(location: Location, config: EngineConfig) -> Self {
        Self {
            location,
            config,
            databases: Mutex::new(HashMap::new()),
        }
    }

    /// Opens `name` at `version`.
    ///
    /// If the database is new or older than `version`, `on_upgrade` runs
    /// inside a version-change transaction and the open resolves once that
    /// transaction has committed. An error from the callback aborts the
    /// upgrade and leaves the stored database untouched.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidVersion`] for version 0
    /// - [`CoreError::VersionError`] if the stored version is higher
    /// - [`CoreError::Blocked`] if an upgrade is needed while other
    ///   connections are open
    pub async fn open<F>(&self, name: &str, version: u64, on_upgrade: F) -> CoreResult<KvConnection>
    where
        F: FnOnce(&mut KvTransaction, VersionChange) -> CoreResult<()>,
    {
        if version == 0 {
            return Err(CoreError::InvalidVersion { version });
        }
        let (db, guard) = loop {
            let db = self.database(name)?;
            let guard = Arc::clone(&db.state).write_owned().await;
            // A delete that won the lock has unlinked this instance.
            if !db.is_deleted() {
                break (db, guard);
            }
        };
        let stored = guard.version;

        if stored > version {
            return Err(CoreError::VersionError {
                name: name.to_string(),
                requested: version,
                stored,
            });
        }

        if stored < version {
            let open = db.open_connections();
            if open > 0 {
                return Err(CoreError::Blocked {
                    name: name.to_string(),
                    open,
                });
            }

            let change = VersionChange {
                old_version: stored,
                new_version: version,
            };
            tracing::debug!(
                database = name,
                old_version = stored,
                new_version = version,
                "upgrading database"
            );

            let mut tx = KvTransaction::version_change(Arc::clone(&db), guard, version);
            on_upgrade(&mut tx, change)?;
            let names = tx.object_store_names();
            tx.commit().await?;
            return Ok(KvConnection::new(db, version, names));
        }

        let names = guard.store_names();
        drop(guard);
        Ok(KvConnection::new(db, version, names))
    }

    /// Deletes a database and its log.
    ///
    /// Deleting a database that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Blocked`] while connections to it are open.
    pub async fn delete_database(&self, name: &str) -> CoreResult<()> {
        validate_name(name)?;
        loop {
            let cached = self.databases.lock().get(name).cloned();
            let _exclusive = match &cached {
                Some(db) => Some(db.state.write().await),
                None => None,
            };
            if let Some(db) = &cached {
                let open = db.open_connections();
                if open > 0 {
                    return Err(CoreError::Blocked {
                        name: name.to_string(),
                        open,
                    });
                }
            }

            let mut databases = self.databases.lock();
            let unchanged = match (databases.get(name), &cached) {
                (None, None) => true,
                (Some(current), Some(db)) => Arc::ptr_eq(current, db),
                _ => false,
            };
            if !unchanged {
                continue;
            }
            if let Some(db) = databases.remove(name) {
                db.deleted.store(true, Ordering::Release);
            }
            if let Location::Directory(dir) = &self.location {
                match std::fs::remove_file(self.log_path(dir, name)) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            break;
        }
        tracing::debug!(database = name, "database deleted");
        Ok(())
    }

    /// Lists the databases this factory knows about, sorted by name.
    pub fn database_names(&self) -> CoreResult<Vec<String>> {
        let mut names: Vec<String> = self.databases.lock().keys().cloned().collect();

        if let Location::Directory(dir) = &self.location {
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                let is_log = path
                    .extension()
                    .is_some_and(|ext| ext == self.config.log_extension.as_str());
                if !is_log {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    fn database(&self, name: &str) -> CoreResult<Arc<DatabaseShared>> {
        validate_name(name)?;
        let mut databases = self.databases.lock();
        if let Some(db) = databases.get(name) {
            return Ok(Arc::clone(db));
        }

        let backend: Box<dyn StorageBackend> = match &self.location {
            Location::Memory => Box::new(InMemoryBackend::new()),
            Location::Directory(dir) => Box::new(FileBackend::open(&self.log_path(dir, name))?),
        };
        let db = Arc::new(DatabaseShared::load(name, backend, &self.config)?);
        databases.insert(name.to_string(), Arc::clone(&db));
        Ok(db)
    }

    fn log_path(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.{}", self.config.log_extension))
    }
}

impl std::fmt::Debug for KvFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let location = match &self.location {
            Location::Memory => "memory".to_string(),
            Location::Directory(dir) => dir.display().to_string(),
        };
        f.debug_struct("KvFactory")
            .field("location", &location)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn validate_name(name: &str) -> CoreResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(CoreError::data(format!("invalid database name {name:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StoreOptions;
    use recordkit_codec::Value;

    fn create_todo(tx: &mut KvTransaction, _change: VersionChange) -> CoreResult<()> {
        tx.create_object_store("Todo", StoreOptions::auto_increment("key"))
    }

    #[tokio::test]
    async fn first_open_runs_upgrade() {
        let factory = KvFactory::in_memory();
        let mut seen = None;
        let conn = factory
            .open("myidb", 1, |tx, change| {
                seen = Some(change);
                create_todo(tx, change)
            })
            .await
            .unwrap();

        assert_eq!(
            seen,
            Some(VersionChange {
                old_version: 0,
                new_version: 1
            })
        );
        assert_eq!(conn.version(), 1);
        assert_eq!(conn.object_store_names(), ["Todo"]);
    }

    #[tokio::test]
    async fn same_version_skips_upgrade() {
        let factory = KvFactory::in_memory();
        factory.open("myidb", 1, create_todo).await.unwrap().close();

        let conn = factory
            .open("myidb", 1, |_, _| panic!("upgrade must not run"))
            .await
            .unwrap();
        assert_eq!(conn.object_store_names(), ["Todo"]);
    }

    #[tokio::test]
    async fn version_zero_rejected() {
        let factory = KvFactory::in_memory();
        let err = factory.open("myidb", 0, create_todo).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidVersion { version: 0 }));
    }

    #[tokio::test]
    async fn lower_version_rejected() {
        let factory = KvFactory::in_memory();
        factory.open("myidb", 2, create_todo).await.unwrap().close();

        let err = factory.open("myidb", 1, create_todo).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::VersionError {
                requested: 1,
                stored: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn upgrade_blocked_by_open_connection() {
        let factory = KvFactory::in_memory();
        let _held = factory.open("myidb", 1, create_todo).await.unwrap();

        let err = factory.open("myidb", 2, |_, _| Ok(())).await.unwrap_err();
        assert!(matches!(err, CoreError::Blocked { open: 1, .. }));
    }

    #[tokio::test]
    async fn failed_upgrade_leaves_nothing_behind() {
        let factory = KvFactory::in_memory();
        let err = factory
            .open("myidb", 1, |tx, change| {
                create_todo(tx, change)?;
                Err(CoreError::invalid_state("boom"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));

        let mut ran = false;
        let conn = factory
            .open("myidb", 1, |tx, change| {
                ran = true;
                create_todo(tx, change)
            })
            .await
            .unwrap();
        assert!(ran);
        assert_eq!(conn.object_store_names(), ["Todo"]);
    }

    #[tokio::test]
    async fn databases_survive_reopen_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        {
            let factory = KvFactory::with_directory(dir.path()).unwrap();
            let conn = factory.open("myidb", 1, create_todo).await.unwrap();
            let mut tx = conn
                .transaction(&["Todo"], TransactionMode::ReadWrite)
                .await
                .unwrap();
            tx.object_store("Todo")
                .unwrap()
                .add(Value::from_fields([("text", "milk")]))
                .unwrap();
            tx.commit().await.unwrap();
        }

        let factory = KvFactory::with_directory(dir.path()).unwrap();
        assert_eq!(factory.database_names().unwrap(), ["myidb"]);

        let conn = factory
            .open("myidb", 1, |_, _| panic!("already created"))
            .await
            .unwrap();
        let mut tx = conn
            .transaction(&["Todo"], TransactionMode::ReadOnly)
            .await
            .unwrap();
        let all = tx.object_store("Todo").unwrap().get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].get("key"), Some(&Value::Integer(1)));
    }

    #[tokio::test]
    async fn delete_database() {
        let dir = tempfile::tempdir().unwrap();
        let factory = KvFactory::with_directory(dir.path()).unwrap();
        let conn = factory.open("myidb", 1, create_todo).await.unwrap();

        assert!(matches!(
            factory.delete_database("myidb").await,
            Err(CoreError::Blocked { .. })
        ));

        conn.close();
        factory.delete_database("myidb").await.unwrap();
        assert!(factory.database_names().unwrap().is_empty());

        // Reopening starts from scratch.
        let mut ran = false;
        factory
            .open("myidb", 1, |tx, change| {
                ran = true;
                create_todo(tx, change)
            })
            .await
            .unwrap();
        assert!(ran);
    }

    #[tokio::test]
    async fn open_waiting_on_deleted_database_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(KvFactory::with_directory(dir.path()).unwrap());
        factory.open("myidb", 1, create_todo).await.unwrap().close();

        let db = factory.database("myidb").unwrap();
        let held = db.state.write().await;

        let deleting = tokio::spawn({
            let factory = Arc::clone(&factory);
            async move { factory.delete_database("myidb").await }
        });
        tokio::task::yield_now().await;
        let opening = tokio::spawn({
            let factory = Arc::clone(&factory);
            async move {
                let mut ran = false;
                let conn = factory
                    .open("myidb", 1, |tx, change| {
                        ran = true;
                        create_todo(tx, change)
                    })
                    .await?;
                conn.close();
                Ok::<_, CoreError>(ran)
            }
        });
        tokio::task::yield_now().await;
        drop(held);

        deleting.await.unwrap().unwrap();
        assert!(opening.await.unwrap().unwrap());
        assert!(db.is_deleted());

        let reopened = KvFactory::with_directory(dir.path()).unwrap();
        assert_eq!(reopened.database_names().unwrap(), ["myidb"]);
        let conn = reopened
            .open("myidb", 1, |_, _| panic!("recreated after delete"))
            .await
            .unwrap();
        assert_eq!(conn.object_store_names(), ["Todo"]);
    }

    #[tokio::test]
    async fn rejects_path_like_names() {
        let factory = KvFactory::in_memory();
        for name in ["", "..", "a/b", "a\\b"] {
            assert!(factory.open(name, 1, create_todo).await.is_err());
        }
    }
}
