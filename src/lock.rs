//! Single-instance execution lock for synchronization passes.
//!
//! The lock is a single JSON record in the state directory carrying holder
//! identity and acquisition time. It is a mutual-exclusion gate, not a
//! queue: a second pass fails immediately with [`LockError::AlreadyRunning`].
//! A record older than [`STALE_AFTER_SECS`] is presumed abandoned by a
//! crashed run and is cleared transparently by the next acquirer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Age after which a lock record is treated as abandoned (24 hours).
pub const STALE_AFTER_SECS: i64 = 24 * 60 * 60;

const LOCK_FILE_NAME: &str = "sync.lock";

/// Result type alias for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;

/// Errors that can occur acquiring the lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// A valid (non-stale) lock is held by another process. This is a normal
    /// concurrency guard under frequent scheduling, not a system error.
    #[error("another instance is already running (pid {pid}, since {acquired_at})")]
    AlreadyRunning {
        pid: u32,
        acquired_at: DateTime<Utc>,
    },

    /// An I/O error occurred on the lock file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The lock record could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The persisted lock record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRecord {
    /// Process id of the holder.
    pub pid: u32,
    /// Hostname of the holder, for operator diagnostics.
    pub hostname: String,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
}

impl LockRecord {
    fn new() -> Self {
        Self {
            pid: std::process::id(),
            hostname: hostname(),
            acquired_at: Utc::now(),
        }
    }

    /// Whether this record is past the staleness threshold.
    pub fn is_stale(&self) -> bool {
        (Utc::now() - self.acquired_at).num_seconds() > STALE_AFTER_SECS
    }
}

/// Read-only lock state, for the `status` command and health probing.
#[derive(Debug)]
pub enum LockStatus {
    /// No lock record exists.
    Free,
    /// A valid lock is held.
    Held(LockRecord),
    /// A lock record exists but is past the staleness threshold.
    Stale(LockRecord),
}

/// Handle to the lock file location for a state directory.
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Lock location for the given state directory.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(LOCK_FILE_NAME),
        }
    }

    /// Acquire the lock, writing a fresh record.
    ///
    /// A stale or unreadable existing record is removed and acquisition
    /// proceeds; a valid one fails with [`LockError::AlreadyRunning`].
    /// Release happens when the returned guard drops, so it fires on every
    /// exit path of a pass.
    pub fn acquire(&self) -> Result<LockGuard> {
        if self.path.exists() {
            match self.read_record() {
                Ok(record) if record.is_stale() => {
                    warn!(
                        "Removing stale lock (held by pid {} since {})",
                        record.pid, record.acquired_at
                    );
                    fs::remove_file(&self.path)?;
                }
                Ok(record) => {
                    return Err(LockError::AlreadyRunning {
                        pid: record.pid,
                        acquired_at: record.acquired_at,
                    });
                }
                Err(e) => {
                    warn!("Removing unreadable lock file: {}", e);
                    fs::remove_file(&self.path)?;
                }
            }
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let record = LockRecord::new();
        let content = serde_json::to_string_pretty(&record)?;
        fs::write(&self.path, content)?;

        info!("Lock acquired (pid {})", record.pid);
        Ok(LockGuard {
            path: self.path.clone(),
        })
    }

    /// Inspect the lock without acquiring it.
    pub fn status(&self) -> LockStatus {
        if !self.path.exists() {
            return LockStatus::Free;
        }
        match self.read_record() {
            Ok(record) if record.is_stale() => LockStatus::Stale(record),
            Ok(record) => LockStatus::Held(record),
            // Unreadable counts as stale: the next acquirer will clear it.
            Err(_) => LockStatus::Stale(LockRecord {
                pid: 0,
                hostname: "unknown".to_string(),
                acquired_at: DateTime::<Utc>::MIN_UTC,
            }),
        }
    }

    fn read_record(&self) -> Result<LockRecord> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Scoped lock ownership; removes the lock record on drop.
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => info!("Lock released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to release lock: {}", e),
        }
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_drop_releases() {
        let dir = tempfile::tempdir().unwrap();
        let lock = LockFile::new(dir.path());

        let guard = lock.acquire().unwrap();
        assert!(matches!(lock.status(), LockStatus::Held(_)));

        drop(guard);
        assert!(matches!(lock.status(), LockStatus::Free));
    }

    #[test]
    fn test_second_acquire_fails() {
        let dir = tempfile::tempdir().unwrap();
        let lock = LockFile::new(dir.path());

        let _guard = lock.acquire().unwrap();
        match LockFile::new(dir.path()).acquire() {
            Err(LockError::AlreadyRunning { pid, .. }) => {
                assert_eq!(pid, std::process::id());
            }
            other => panic!("expected AlreadyRunning, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_stale_lock_is_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let lock = LockFile::new(dir.path());

        let backdated = LockRecord {
            pid: 12345,
            hostname: "old-host".to_string(),
            acquired_at: Utc::now() - chrono::Duration::seconds(STALE_AFTER_SECS + 60),
        };
        fs::write(
            dir.path().join(LOCK_FILE_NAME),
            serde_json::to_string(&backdated).unwrap(),
        )
        .unwrap();
        assert!(matches!(lock.status(), LockStatus::Stale(_)));

        let guard = lock.acquire().expect("stale lock should be recovered");
        assert!(matches!(lock.status(), LockStatus::Held(_)));
        drop(guard);
    }

    #[test]
    fn test_corrupt_lock_is_recovered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(dir.path().join(LOCK_FILE_NAME), "not json").unwrap();

        let lock = LockFile::new(dir.path());
        let _guard = lock.acquire().expect("corrupt lock should be recovered");
    }
}
