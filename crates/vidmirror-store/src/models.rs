//! Progress record model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Status of a tracked conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    /// Work on the current fingerprint has started but not committed.
    /// A record left in this state by an interrupted run is retried from
    /// scratch on the next pass.
    InProgress,
    /// The output artifact for the recorded fingerprint is fully written
    /// and visible at its final path.
    Completed,
}

/// Persisted state for one source file that has been selected for
/// processing at least once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Path of the source file, relative to the source root.
    pub source_path: PathBuf,
    /// Content fingerprint of the source at the time work started.
    pub source_hash: String,
    /// Source size in bytes at the time work started.
    pub source_size: u64,
    /// Source modification time (seconds since epoch) at the time work
    /// started.
    pub source_mtime: i64,
    /// Derived artifact path, relative to the output root.
    pub output_path: PathBuf,
    /// Current status.
    pub status: ConversionStatus,
    /// When this record was last written.
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Whether the record is completed for the given source fingerprint.
    pub fn is_completed_for(&self, hash: &str) -> bool {
        self.status == ConversionStatus::Completed && self.source_hash == hash
    }
}
