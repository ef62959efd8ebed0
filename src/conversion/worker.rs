//! Conversion worker: decides and performs per-file work.

use crate::scanner::SourceEntry;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use vidmirror_av::Encoder;
use vidmirror_common::{copy_temp_path, temp_path};
use vidmirror_store::{ConversionStatus, ProgressRecord, ProgressStore};

/// Filesystems disagree on sub-second mtime precision; compare within 1 s.
const MTIME_TOLERANCE_SECS: i64 = 1;

/// What the worker did with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Video transcoded and committed.
    Converted,
    /// Non-video copied verbatim.
    Copied,
    /// Already up to date (or vanished before processing), nothing written.
    Skipped,
}

/// Processes one source entry into one output artifact.
pub struct ConversionWorker<'a> {
    output_root: &'a Path,
    store: &'a dyn ProgressStore,
    encoder: &'a dyn Encoder,
}

impl<'a> ConversionWorker<'a> {
    pub fn new(
        output_root: &'a Path,
        store: &'a dyn ProgressStore,
        encoder: &'a dyn Encoder,
    ) -> Self {
        Self {
            output_root,
            store,
            encoder,
        }
    }

    /// Process a single source entry.
    ///
    /// Decides between skip, verbatim copy, and transcode; the decision is
    /// driven by the stored progress record and the current fingerprint.
    pub fn process(&self, entry: &SourceEntry) -> Result<FileOutcome> {
        // The source may have vanished since the scan; not an error.
        if !entry.abs_path.exists() {
            debug!("Source vanished before processing: {:?}", entry.rel_path);
            return Ok(FileOutcome::Skipped);
        }

        if entry.is_video {
            self.process_video(entry)
        } else {
            self.process_copy(entry)
        }
    }

    fn process_copy(&self, entry: &SourceEntry) -> Result<FileOutcome> {
        let output_abs = self.output_root.join(entry.output_rel());
        let hash = entry
            .fingerprint()
            .with_context(|| format!("fingerprinting {:?}", entry.rel_path))?;

        if output_abs.exists() {
            if let Some(record) = self.store.get(&entry.rel_path)? {
                if record.is_completed_for(&hash) {
                    debug!("Skipping (up-to-date): {:?}", entry.rel_path);
                    return Ok(FileOutcome::Skipped);
                }
            }
        }

        if let Some(parent) = output_abs.parent() {
            fs::create_dir_all(parent)?;
        }

        // Stage the copy next to the final path; only the rename makes it
        // visible, so a reader never sees a half-copied file.
        let temp = copy_temp_path(&output_abs);
        if let Err(e) = fs::copy(&entry.abs_path, &temp) {
            if temp.exists() {
                if let Err(rm) = fs::remove_file(&temp) {
                    warn!("Failed to remove temp artifact {:?}: {}", temp, rm);
                }
            }
            return Err(e).with_context(|| format!("copying {:?}", entry.rel_path));
        }
        if output_abs.exists() {
            fs::remove_file(&output_abs)?;
        }
        fs::rename(&temp, &output_abs)
            .with_context(|| format!("committing {:?}", entry.output_rel()))?;

        self.store
            .put(&self.record(entry, hash, ConversionStatus::Completed))?;

        info!("Copied: {:?}", entry.rel_path);
        Ok(FileOutcome::Copied)
    }

    fn process_video(&self, entry: &SourceEntry) -> Result<FileOutcome> {
        let output_abs = self.output_root.join(entry.output_rel());
        let hash = entry
            .fingerprint()
            .with_context(|| format!("fingerprinting {:?}", entry.rel_path))?;

        if output_abs.exists() {
            if let Some(record) = self.store.get(&entry.rel_path)? {
                if self.is_unchanged(&record, entry, &hash) {
                    debug!("Skipping (up-to-date): {:?}", entry.rel_path);
                    return Ok(FileOutcome::Skipped);
                }
                if record.source_hash != hash {
                    info!("Source changed, reconverting: {:?}", entry.rel_path);
                }
            }
        }

        // Mark in-progress with the NEW fingerprint before any work, so an
        // interruption leaves a retryable record for this exact content.
        self.store
            .put(&self.record(entry, hash.clone(), ConversionStatus::InProgress))?;

        if let Some(parent) = output_abs.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp = temp_path(&output_abs);
        if temp.exists() {
            info!("Removing incomplete artifact: {:?}", temp);
            fs::remove_file(&temp)?;
        }

        info!(
            "Converting: {:?} -> {:?}",
            entry.rel_path,
            entry.output_rel()
        );

        let rel = entry.rel_path.clone();
        let encode_result = self.encoder.encode(&entry.abs_path, &temp, &mut |p| {
            match (p.percent, p.eta) {
                (Some(pct), Some(eta)) => {
                    info!("{:?}: {:.1}% (ETA {}s)", rel, pct, eta.as_secs());
                }
                _ => {
                    info!("{:?}: position {}s", rel, p.position.as_secs());
                }
            }
        });

        if let Err(e) = encode_result {
            // Purge the temp artifact; the InProgress record makes the next
            // pass retry this source from scratch.
            if temp.exists() {
                if let Err(rm) = fs::remove_file(&temp) {
                    warn!("Failed to remove temp artifact {:?}: {}", temp, rm);
                }
            }
            return Err(e).with_context(|| format!("converting {:?}", entry.rel_path));
        }

        // Commit point: atomic rename is the only way an artifact becomes
        // visible at its final path.
        if output_abs.exists() {
            fs::remove_file(&output_abs)?;
        }
        fs::rename(&temp, &output_abs)
            .with_context(|| format!("committing {:?}", entry.output_rel()))?;

        self.store
            .put(&self.record(entry, hash, ConversionStatus::Completed))?;

        info!("Converted: {:?}", entry.output_rel());
        Ok(FileOutcome::Converted)
    }

    fn is_unchanged(&self, record: &ProgressRecord, entry: &SourceEntry, hash: &str) -> bool {
        record.is_completed_for(hash)
            && record.source_size == entry.size
            && (record.source_mtime - entry.mtime).abs() <= MTIME_TOLERANCE_SECS
            && record.output_path == entry.output_rel()
    }

    fn record(&self, entry: &SourceEntry, hash: String, status: ConversionStatus) -> ProgressRecord {
        ProgressRecord {
            source_path: entry.rel_path.clone(),
            source_hash: hash,
            source_size: entry.size,
            source_mtime: entry.mtime,
            output_path: entry.output_rel(),
            status,
            updated_at: Utc::now(),
        }
    }
}
