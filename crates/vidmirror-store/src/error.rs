//! Error types for vidmirror-store.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing progress records.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The store directory could not be created or accessed.
    #[error("store directory unavailable: {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on an individual record.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized or deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
