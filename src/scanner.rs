//! Source-tree scanning.
//!
//! Walks the source root and produces the [`SourceEntry`] set a pass works
//! from. The filesystem is a non-transactional external data source: entries
//! can vanish between this scan and later processing, so consumers re-check
//! existence before acting.

use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};
use vidmirror_common::{fingerprint_file, is_video_file, output_rel_path};
use walkdir::WalkDir;

/// A file discovered under the source root.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    /// Path relative to the source root.
    pub rel_path: PathBuf,
    /// Absolute path.
    pub abs_path: PathBuf,
    /// Size in bytes at scan time.
    pub size: u64,
    /// Modification time in seconds since the epoch at scan time.
    pub mtime: i64,
    /// Whether the extension is on the convertible allow-list.
    pub is_video: bool,
}

impl SourceEntry {
    /// Derived artifact path relative to the output root.
    pub fn output_rel(&self) -> PathBuf {
        output_rel_path(&self.rel_path)
    }

    /// Content fingerprint of the source file (bounded-prefix hash).
    ///
    /// Computed on demand, not at scan time: a pass over an unchanged tree
    /// should not rehash files it will end up skipping by record lookup.
    pub fn fingerprint(&self) -> io::Result<String> {
        fingerprint_file(&self.abs_path)
    }
}

/// Scan the source root and return all regular files under it.
pub fn scan_source(source_root: &Path) -> Result<Vec<SourceEntry>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(source_root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let abs_path = entry.path().to_path_buf();
        let rel_path = abs_path
            .strip_prefix(source_root)
            .context("walked entry outside source root")?
            .to_path_buf();

        // The file may have vanished since the directory read.
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                debug!("Skipping vanished source entry {:?}: {}", rel_path, e);
                continue;
            }
        };

        let mtime = match metadata.modified().map(|t| t.duration_since(UNIX_EPOCH)) {
            Ok(Ok(d)) => d.as_secs() as i64,
            _ => {
                warn!("No usable mtime for {:?}, treating as 0", rel_path);
                0
            }
        };

        entries.push(SourceEntry {
            is_video: is_video_file(&rel_path),
            rel_path,
            abs_path,
            size: metadata.len(),
            mtime,
        });
    }

    Ok(entries)
}
