//! # vidmirror-store
//!
//! Persistence for per-source-file conversion state.
//!
//! Each tracked source file has exactly one [`ProgressRecord`], addressed by
//! a stable hash of its relative path. Records are individually persisted so
//! a crash mid-update can corrupt at most one record, never the whole store.
//! The [`ProgressStore`] trait keeps the backend swappable; the shipped
//! backend is [`FlatFileStore`], one JSON document per record.

mod error;
mod flat_file;
mod models;

pub use error::{Error, Result};
pub use flat_file::FlatFileStore;
pub use models::{ConversionStatus, ProgressRecord};

use std::path::Path;

/// Key-value store of [`ProgressRecord`]s keyed by source-relative path.
pub trait ProgressStore {
    /// Look up the record for a source-relative path, if any.
    fn get(&self, rel_path: &Path) -> Result<Option<ProgressRecord>>;

    /// Insert or overwrite the record for its source path.
    fn put(&self, record: &ProgressRecord) -> Result<()>;

    /// Delete the record for a source-relative path. Deleting a missing
    /// record is a no-op.
    fn delete(&self, rel_path: &Path) -> Result<()>;

    /// All records, unordered. Used only for orphan detection; individually
    /// unreadable records are skipped with a warning, not fatal.
    fn list_all(&self) -> Result<Vec<ProgressRecord>>;
}
