//! Transactions.

use crate::engine::factory::DatabaseShared;
use crate::engine::log::LogOp;
use crate::engine::object_store::ObjectStore;
use crate::engine::state::{DatabaseState, StoreData};
use crate::error::{CoreError, CoreResult};
use crate::types::{StoreOptions, TransactionMode};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard};

enum Guard {
    Read(OwnedRwLockReadGuard<DatabaseState>),
    Write(OwnedRwLockWriteGuard<DatabaseState>),
}

impl Guard {
    fn state(&self) -> &DatabaseState {
        match self {
            Self::Read(g) => &**g,
            Self::Write(g) => &**g,
        }
    }
}

/// A transaction over a fixed set of object stores.
///
/// Read-only transactions share the database with each other. Read/write
/// and version-change transactions hold it exclusively until they finish.
///
/// Writes are staged on private copies of the stores they touch and become
/// visible only when [`KvTransaction::commit`] succeeds. Dropping an
/// uncommitted transaction discards them.
pub struct KvTransaction {
    db: Arc<DatabaseShared>,
    guard: Guard,
    mode: TransactionMode,
    /// Stores the transaction may touch; `None` means all of them.
    scope: Option<Vec<String>>,
    staged: BTreeMap<String, StoreData>,
    ops: Vec<LogOp>,
    finished: bool,
}

impl KvTransaction {
    pub(crate) fn read(
        db: Arc<DatabaseShared>,
        guard: OwnedRwLockReadGuard<DatabaseState>,
        scope: Vec<String>,
    ) -> Self {
        Self::new(db, Guard::Read(guard), TransactionMode::ReadOnly, Some(scope))
    }

    pub(crate) fn read_write(
        db: Arc<DatabaseShared>,
        guard: OwnedRwLockWriteGuard<DatabaseState>,
        scope: Vec<String>,
    ) -> Self {
        Self::new(db, Guard::Write(guard), TransactionMode::ReadWrite, Some(scope))
    }

    pub(crate) fn version_change(
        db: Arc<DatabaseShared>,
        guard: OwnedRwLockWriteGuard<DatabaseState>,
        new_version: u64,
    ) -> Self {
        let mut tx = Self::new(db, Guard::Write(guard), TransactionMode::VersionChange, None);
        tx.ops.push(LogOp::SetVersion(new_version));
        tx
    }

    fn new(
        db: Arc<DatabaseShared>,
        guard: Guard,
        mode: TransactionMode,
        scope: Option<Vec<String>>,
    ) -> Self {
        Self {
            db,
            guard,
            mode,
            scope,
            staged: BTreeMap::new(),
            ops: Vec::new(),
            finished: false,
        }
    }

    /// Returns the transaction mode.
    #[must_use]
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Names of the stores visible to this transaction, sorted.
    #[must_use]
    pub fn object_store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .guard
            .state()
            .stores
            .keys()
            .chain(self.staged.keys())
            .filter(|name| self.in_scope(name))
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Creates an object store. Only allowed during an upgrade.
    ///
    /// # Errors
    ///
    /// Fails outside a version-change transaction or if the store exists.
    pub fn create_object_store(&mut self, name: &str, options: StoreOptions) -> CoreResult<()> {
        if self.mode != TransactionMode::VersionChange {
            return Err(CoreError::invalid_state(
                "object stores can only be created while upgrading",
            ));
        }
        if self.store_data(name).is_some() {
            return Err(CoreError::Constraint {
                message: format!("object store {name} already exists"),
            });
        }
        tracing::debug!(database = %self.db.name, store = name, "creating object store");
        self.staged
            .insert(name.to_string(), StoreData::new(options.clone()));
        self.ops.push(LogOp::CreateStore {
            name: name.to_string(),
            options,
        });
        Ok(())
    }

    /// Opens one of the transaction's object stores.
    ///
    /// # Errors
    ///
    /// Fails if the store is outside the transaction scope or does not exist.
    pub fn object_store(&mut self, name: &str) -> CoreResult<ObjectStore<'_>> {
        if !self.in_scope(name) {
            return Err(CoreError::OutOfScope {
                name: name.to_string(),
            });
        }
        if self.store_data(name).is_none() {
            return Err(CoreError::not_found(name));
        }
        Ok(ObjectStore::new(self, name.to_string()))
    }

    /// Commits staged writes.
    ///
    /// Resolves once the log entry is written. Committing a transaction that
    /// wrote nothing only releases it.
    ///
    /// # Errors
    ///
    /// If the log append fails nothing becomes visible.
    pub async fn commit(mut self) -> CoreResult<()> {
        self.finished = true;
        let ops = std::mem::take(&mut self.ops);
        let staged = std::mem::take(&mut self.staged);

        if let Guard::Write(state) = &mut self.guard {
            if !ops.is_empty() {
                self.db.append(&ops)?;
                for (name, data) in staged {
                    state.stores.insert(name, data);
                }
                for op in &ops {
                    if let LogOp::SetVersion(version) = op {
                        state.version = *version;
                    }
                }
                tracing::debug!(database = %self.db.name, ops = ops.len(), "transaction committed");
            }
        }
        tokio::task::yield_now().await;
        Ok(())
    }

    /// Abandons the transaction, discarding staged writes.
    pub fn abort(mut self) {
        self.discard();
    }

    pub(crate) fn store_data(&self, name: &str) -> Option<&StoreData> {
        self.staged
            .get(name)
            .or_else(|| self.guard.state().stores.get(name))
    }

    /// Returns a private copy of the store, staging it on first write.
    pub(crate) fn store_data_mut(&mut self, name: &str) -> CoreResult<&mut StoreData> {
        if !self.mode.is_write() {
            return Err(CoreError::ReadOnly {
                store: name.to_string(),
            });
        }
        if !self.staged.contains_key(name) {
            let committed = self
                .guard
                .state()
                .stores
                .get(name)
                .cloned()
                .ok_or_else(|| CoreError::not_found(name))?;
            self.staged.insert(name.to_string(), committed);
        }
        self.staged
            .get_mut(name)
            .ok_or_else(|| CoreError::not_found(name))
    }

    pub(crate) fn record_op(&mut self, op: LogOp) {
        self.ops.push(op);
    }

    fn in_scope(&self, name: &str) -> bool {
        self.scope
            .as_ref()
            .is_none_or(|scope| scope.iter().any(|s| s == name))
    }

    fn discard(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let pending = self.ops.len();
        self.ops.clear();
        self.staged.clear();
        if pending > 0 {
            tracing::debug!(database = %self.db.name, ops = pending, "transaction rolled back");
        }
    }
}

impl Drop for KvTransaction {
    fn drop(&mut self) {
        self.discard();
    }
}

impl std::fmt::Debug for KvTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvTransaction")
            .field("database", &self.db.name)
            .field("mode", &self.mode)
            .field("scope", &self.scope)
            .field("pending_ops", &self.ops.len())
            .finish()
    }
}
