//! Orchestration of one synchronization pass.
//!
//! A pass runs: acquire lock → preconditions → sweep temporary artifacts and
//! reconcile dangling records → apply structural tree changes → process every
//! source file → report. The lock guard releases on drop, so every exit path
//! of the pass (including fatal ones) releases it; the staleness rule in
//! [`crate::lock`] covers abrupt termination that skips drops entirely.

use crate::config::Config;
use crate::conversion::{ConversionWorker, FileOutcome};
use crate::differ::{self, ApplyStats};
use crate::lock::{LockError, LockFile};
use crate::scanner::{self, SourceEntry};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};
use vidmirror_av::Encoder;
use vidmirror_common::{fingerprint_file, is_temp_artifact};
use vidmirror_store::{ConversionStatus, FlatFileStore, ProgressStore};
use walkdir::WalkDir;

/// Aggregate outcome of a pass, consumed by the external scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every file succeeded.
    Success,
    /// The pass completed but some files failed; they stay retryable.
    Degraded,
    /// Another instance holds a valid lock; nothing was touched.
    AlreadyRunning,
    /// An unrecoverable precondition failed before file processing.
    Fatal,
}

impl PassOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            PassOutcome::Success => 0,
            PassOutcome::Fatal => 1,
            PassOutcome::AlreadyRunning => 2,
            PassOutcome::Degraded => 3,
        }
    }
}

/// Counts reported at the end of a pass.
#[derive(Debug, Default)]
pub struct PassSummary {
    pub converted: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub created_dirs: usize,
    pub removed_files: usize,
    pub removed_dirs: usize,
    pub swept_temps: usize,
}

/// Result of [`run_pass`].
#[derive(Debug)]
pub struct PassReport {
    pub outcome: PassOutcome,
    pub summary: PassSummary,
}

/// Run one synchronization pass.
pub fn run_pass(config: &Config, encoder: &dyn Encoder) -> PassReport {
    let state_dir = &config.sync.state_dir;

    let guard = match LockFile::new(state_dir).acquire() {
        Ok(guard) => guard,
        Err(LockError::AlreadyRunning { pid, acquired_at }) => {
            info!(
                "Another instance is already running (pid {}, since {})",
                pid, acquired_at
            );
            return PassReport {
                outcome: PassOutcome::AlreadyRunning,
                summary: PassSummary::default(),
            };
        }
        Err(e) => {
            error!("Failed to acquire lock: {}", e);
            return PassReport {
                outcome: PassOutcome::Fatal,
                summary: PassSummary::default(),
            };
        }
    };

    let report = match run_locked(config, encoder) {
        Ok(summary) => {
            let outcome = if summary.failed == 0 {
                PassOutcome::Success
            } else {
                PassOutcome::Degraded
            };
            PassReport { outcome, summary }
        }
        Err(e) => {
            error!("Pass aborted: {:#}", e);
            PassReport {
                outcome: PassOutcome::Fatal,
                summary: PassSummary::default(),
            }
        }
    };

    drop(guard);
    report
}

fn run_locked(config: &Config, encoder: &dyn Encoder) -> Result<PassSummary> {
    let source_root = &config.sync.source_root;
    let output_root = &config.sync.output_root;

    info!("Starting sync: {:?} -> {:?}", source_root, output_root);

    // Preconditions: these are the only fatal failures of a pass.
    if !source_root.exists() {
        anyhow::bail!("source root does not exist: {:?}", source_root);
    }
    fs::create_dir_all(output_root)
        .with_context(|| format!("creating output root {:?}", output_root))?;

    let store = FlatFileStore::open(config.sync.state_dir.join("progress"))
        .context("opening progress store")?;

    let mut summary = PassSummary::default();

    // Step 1: sweep remnants of interrupted conversions. Must finish before
    // any new conversion starts so a fresh temp file can't be mistaken for a
    // leftover.
    summary.swept_temps = sweep_temp_artifacts(output_root);
    reconcile_records(&store, source_root, output_root);

    // Step 2: structural changes.
    let entries = scanner::scan_source(source_root).context("scanning source root")?;
    let delta = differ::compute_delta(source_root, &entries, output_root)
        .context("computing tree delta")?;

    let mut apply_stats = ApplyStats::default();
    differ::apply_creations(&delta, output_root, &mut apply_stats);
    differ::apply_removals(&delta, output_root, &store, &mut apply_stats);
    summary.created_dirs = apply_stats.created_dirs;
    summary.removed_files = apply_stats.removed_files;
    summary.removed_dirs = apply_stats.removed_dirs;

    // Step 3: per-file processing, isolated failures.
    process_entries(&entries, output_root, &store, encoder, &mut summary);

    info!(
        "Sync completed: {} converted, {} copied, {} skipped, {} failed, {} files removed, {} dirs removed",
        summary.converted,
        summary.copied,
        summary.skipped,
        summary.failed,
        summary.removed_files,
        summary.removed_dirs
    );

    Ok(summary)
}

fn process_entries(
    entries: &[SourceEntry],
    output_root: &Path,
    store: &dyn ProgressStore,
    encoder: &dyn Encoder,
    summary: &mut PassSummary,
) {
    let worker = ConversionWorker::new(output_root, store, encoder);

    for entry in entries {
        match worker.process(entry) {
            Ok(FileOutcome::Converted) => summary.converted += 1,
            Ok(FileOutcome::Copied) => summary.copied += 1,
            Ok(FileOutcome::Skipped) => summary.skipped += 1,
            Err(e) => {
                error!("Failed to process {:?}: {:#}", entry.rel_path, e);
                summary.failed += 1;
            }
        }
    }
}

/// Delete every temporary artifact under the output root.
///
/// These are remnants of interrupted conversions; their progress records
/// stay InProgress so the per-file step reprocesses the sources.
fn sweep_temp_artifacts(output_root: &Path) -> usize {
    if !output_root.exists() {
        return 0;
    }

    let mut swept = 0;
    for entry in WalkDir::new(output_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        if !is_temp_artifact(entry.path()) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                info!("Removed incomplete temp file: {:?}", entry.path());
                swept += 1;
            }
            Err(e) => error!("Failed to remove temp file {:?}: {}", entry.path(), e),
        }
    }
    swept
}

/// Reconcile stored records against the filesystem.
///
/// Records whose source no longer exists are deleted. An InProgress record
/// whose committed output exists, post-dates the record, and whose
/// fingerprint still matches means the process died between the commit
/// rename and the final record write; promote it instead of reconverting.
/// An artifact older than the record is a leftover from an earlier commit
/// (the retried encode never renamed over it) and must not be promoted.
fn reconcile_records(store: &FlatFileStore, source_root: &Path, output_root: &Path) {
    let records = match store.list_all() {
        Ok(records) => records,
        Err(e) => {
            warn!("Could not list progress records: {}", e);
            return;
        }
    };

    for mut record in records {
        let source_abs = source_root.join(&record.source_path);

        if !source_abs.exists() {
            info!("Removing orphaned record: {:?}", record.source_path);
            if let Err(e) = store.delete(&record.source_path) {
                warn!("Failed to remove record {:?}: {}", record.source_path, e);
            }
            continue;
        }

        if record.status == ConversionStatus::InProgress
            && artifact_postdates(&output_root.join(&record.output_path), record.updated_at)
        {
            match fingerprint_file(&source_abs) {
                Ok(hash) if hash == record.source_hash => {
                    info!("Promoting completed record: {:?}", record.source_path);
                    record.status = ConversionStatus::Completed;
                    record.updated_at = Utc::now();
                    if let Err(e) = store.put(&record) {
                        warn!("Failed to update record {:?}: {}", record.source_path, e);
                    }
                }
                // Source changed or unreadable; the per-file step decides.
                _ => {}
            }
        }
    }
}

/// Whether the file at `path` was modified at or after `since`.
///
/// Records are written before any encode starts, so a committed artifact is
/// always younger than the record it belongs to. Missing files and coarse
/// filesystem timestamps resolve to `false`; the worst case is one
/// redundant reconversion.
fn artifact_postdates(path: &Path, since: DateTime<Utc>) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|mtime| DateTime::<Utc>::from(mtime) >= since)
        .unwrap_or(false)
}
