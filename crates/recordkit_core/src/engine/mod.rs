//! Embedded transactional key/value engine.
//!
//! Databases are named and versioned. Each holds object stores of records
//! keyed by an in-line key field, optionally generated. All access goes
//! through transactions:
//!
//! - read-only transactions share the database
//! - read/write transactions hold it exclusively and commit atomically
//! - a version-change transaction runs only while opening at a newer version
//!
//! Committed transactions are appended to a checksummed log that is
//! replayed when the database is first opened.

mod connection;
mod cursor;
mod factory;
mod log;
mod object_store;
mod state;
mod transaction;

pub use connection::KvConnection;
pub use cursor::Cursor;
pub use factory::KvFactory;
pub use log::LOG_MAGIC;
pub use object_store::ObjectStore;
pub use transaction::KvTransaction;
