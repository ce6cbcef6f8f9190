//! # recordkit storage
//!
//! Byte log backends that hold one database each.
//!
//! A backend is an **opaque append-only byte log**. It knows nothing about
//! records, collections or transactions; the engine in `recordkit_core`
//! frames and interprets everything written here.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and ephemeral databases
//! - [`FileBackend`] - One file per database, survives restarts
//!
//! ```rust
//! use recordkit_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.append(b"entry").unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"entry");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
