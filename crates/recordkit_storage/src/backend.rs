//! Storage backend trait definition.

use crate::error::StorageResult;

/// An append-only byte log holding one database.
///
/// # Invariants
///
/// - `append` writes after every previously appended byte and returns the
///   offset it wrote at
/// - `read_all` returns every byte appended and not truncated away
/// - after `sync` returns, appended bytes survive process termination
pub trait StorageBackend: Send + Sync {
    /// Reads the whole log.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset it starts at.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Returns the log length in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Makes every appended byte durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be synced.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the log back to `new_size` bytes.
    ///
    /// Used to drop a torn trailing entry and to undo a failed commit.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_size` exceeds the current size or the
    /// medium cannot be resized.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
