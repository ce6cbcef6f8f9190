//! # recordkit core
//!
//! A generic record persistence layer over an embedded transactional
//! key/value engine.
//!
//! This crate provides:
//! - [`engine`]: named, versioned databases of object stores with
//!   read-only and read/write transactions, cursors and a commit log
//! - [`SchemaConfig`]: the fixed list of collections a database declares
//! - [`ConnectionManager`]: one connection per operation, creating
//!   collections on first open
//! - [`scan`]: key-ordered cursor scans with OR-matching [`Query`]s
//! - [`RecordStore`]: typed CRUD over one collection, handed out by [`Store`]

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connection;
pub mod engine;
mod error;
mod query;
pub mod scan;
mod schema;
mod store;
mod types;

pub use config::EngineConfig;
pub use connection::ConnectionManager;
pub use engine::{Cursor, KvConnection, KvFactory, KvTransaction, ObjectStore};
pub use error::{CoreError, CoreResult};
pub use query::Query;
pub use schema::{SchemaConfig, DB_NAME_ENV, DB_VERSION_ENV, SCHEMA_CREATION_VERSION};
pub use store::{RecordStore, Store};
pub use types::{Key, StoreOptions, TransactionMode, VersionChange};
