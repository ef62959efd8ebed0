//! Structural diffing between the source and output trees.
//!
//! Computes folders to create, orphan files to remove, and orphan folders to
//! remove. Creation is applied before any file processing; orphan removal is
//! applied file-first, then folders deepest-first, so cleanup never destroys
//! a folder a conversion is still writing into. Entries that vanish between
//! the scan and the apply step are treated as no-ops.

use crate::scanner::SourceEntry;
use anyhow::Result;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use vidmirror_common::is_temp_artifact;
use vidmirror_store::ProgressStore;
use walkdir::WalkDir;

/// Structural changes needed to reconcile the output tree.
#[derive(Debug, Default)]
pub struct TreeDelta {
    /// Folders present in source but absent in output (relative paths).
    pub dirs_to_create: Vec<PathBuf>,
    /// Output files with no corresponding source entry (relative paths).
    pub orphan_files: Vec<PathBuf>,
    /// Output folders with no corresponding source folder, deepest first.
    pub orphan_dirs: Vec<PathBuf>,
}

impl TreeDelta {
    /// Whether the delta contains no work.
    pub fn is_empty(&self) -> bool {
        self.dirs_to_create.is_empty() && self.orphan_files.is_empty() && self.orphan_dirs.is_empty()
    }
}

/// Counts of structural changes actually applied.
#[derive(Debug, Default)]
pub struct ApplyStats {
    pub created_dirs: usize,
    pub removed_files: usize,
    pub removed_dirs: usize,
}

fn walk_rel_dirs(root: &Path) -> HashSet<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter_map(|e| {
            let rel = e.path().strip_prefix(root).ok()?;
            if rel.as_os_str().is_empty() {
                None
            } else {
                Some(rel.to_path_buf())
            }
        })
        .collect()
}

/// Compute the structural delta between the scanned source and the output
/// tree.
pub fn compute_delta(
    source_root: &Path,
    entries: &[SourceEntry],
    output_root: &Path,
) -> Result<TreeDelta> {
    let source_dirs = walk_rel_dirs(source_root);
    let output_dirs = if output_root.exists() {
        walk_rel_dirs(output_root)
    } else {
        HashSet::new()
    };

    let expected_outputs: HashSet<PathBuf> = entries.iter().map(|e| e.output_rel()).collect();

    let mut delta = TreeDelta::default();

    let mut to_create: Vec<_> = source_dirs.difference(&output_dirs).cloned().collect();
    to_create.sort();
    delta.dirs_to_create = to_create;

    let mut orphan_dirs: Vec<_> = output_dirs.difference(&source_dirs).cloned().collect();
    // Deepest first, so nested orphans are gone before their parents.
    orphan_dirs.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
    delta.orphan_dirs = orphan_dirs;

    if output_root.exists() {
        for entry in WalkDir::new(output_root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Ok(rel) = entry.path().strip_prefix(output_root) else {
                continue;
            };
            // Temp artifacts are the sweep step's concern, not orphans.
            if is_temp_artifact(rel) {
                continue;
            }
            if !expected_outputs.contains(rel) {
                delta.orphan_files.push(rel.to_path_buf());
            }
        }
        delta.orphan_files.sort();
    }

    Ok(delta)
}

/// Create the folders present in source but missing in output.
///
/// A failure on one folder is logged and skipped; unrelated folders still
/// get created and the missing one is retried next pass.
pub fn apply_creations(delta: &TreeDelta, output_root: &Path, stats: &mut ApplyStats) {
    for rel in &delta.dirs_to_create {
        let target = output_root.join(rel);
        if target.exists() {
            continue;
        }
        match fs::create_dir_all(&target) {
            Ok(()) => {
                info!("Created directory: {:?}", rel);
                stats.created_dirs += 1;
            }
            Err(e) => error!("Failed to create directory {:?}: {}", rel, e),
        }
    }
}

/// Remove orphan files (and their progress records), then orphan folders.
pub fn apply_removals(delta: &TreeDelta, output_root: &Path, store: &dyn ProgressStore, stats: &mut ApplyStats) {
    // Records are keyed by source path; map each orphan back through the
    // output path every record carries. This survives any casing of the
    // source extension, which a webm-to-extension guess would not.
    let records = match store.list_all() {
        Ok(records) => records,
        Err(e) => {
            error!("Could not list progress records: {}", e);
            Vec::new()
        }
    };

    for rel in &delta.orphan_files {
        let target = output_root.join(rel);
        if !target.exists() {
            debug!("Orphan file already gone: {:?}", rel);
            continue;
        }
        match fs::remove_file(&target) {
            Ok(()) => {
                info!("Deleted orphaned file: {:?}", rel);
                stats.removed_files += 1;
            }
            Err(e) => {
                error!("Failed to delete orphaned file {:?}: {}", rel, e);
                continue;
            }
        }

        for record in records.iter().filter(|r| &r.output_path == rel) {
            if let Err(e) = store.delete(&record.source_path) {
                error!(
                    "Failed to delete progress record for {:?}: {}",
                    record.source_path, e
                );
            }
        }
    }

    for rel in &delta.orphan_dirs {
        let target = output_root.join(rel);
        if !target.exists() {
            debug!("Orphan directory already gone: {:?}", rel);
            continue;
        }
        match fs::remove_dir_all(&target) {
            Ok(()) => {
                info!("Deleted directory: {:?}", rel);
                stats.removed_dirs += 1;
            }
            Err(e) => error!("Failed to delete directory {:?}: {}", rel, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan_source;
    use vidmirror_store::FlatFileStore;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_delta_creates_missing_dirs() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        touch(&src.path().join("a/b/notes.txt"));

        let entries = scan_source(src.path()).unwrap();
        let delta = compute_delta(src.path(), &entries, out.path()).unwrap();

        assert_eq!(
            delta.dirs_to_create,
            vec![PathBuf::from("a"), PathBuf::from("a/b")]
        );
        assert!(delta.orphan_files.is_empty());
        assert!(delta.orphan_dirs.is_empty());
    }

    #[test]
    fn test_delta_finds_orphans() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        touch(&src.path().join("keep.txt"));
        touch(&out.path().join("keep.txt"));
        touch(&out.path().join("gone.txt"));
        touch(&out.path().join("old/deep/file.txt"));

        let entries = scan_source(src.path()).unwrap();
        let delta = compute_delta(src.path(), &entries, out.path()).unwrap();

        assert!(delta.orphan_files.contains(&PathBuf::from("gone.txt")));
        assert!(delta
            .orphan_files
            .contains(&PathBuf::from("old/deep/file.txt")));
        // Deepest first
        assert_eq!(
            delta.orphan_dirs,
            vec![PathBuf::from("old/deep"), PathBuf::from("old")]
        );
    }

    #[test]
    fn test_converted_artifact_is_not_an_orphan() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        touch(&src.path().join("a/video1.mp4"));
        touch(&out.path().join("a/video1.webm"));

        let entries = scan_source(src.path()).unwrap();
        let delta = compute_delta(src.path(), &entries, out.path()).unwrap();

        assert!(delta.orphan_files.is_empty());
    }

    #[test]
    fn test_temp_artifacts_are_not_orphans() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        touch(&src.path().join("a/video1.mp4"));
        touch(&out.path().join("a/video1.tmp.webm"));

        let entries = scan_source(src.path()).unwrap();
        let delta = compute_delta(src.path(), &entries, out.path()).unwrap();

        assert!(delta.orphan_files.is_empty());
    }

    #[test]
    fn test_apply_removals_deletes_records() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        let store = FlatFileStore::open(state.path()).unwrap();

        touch(&out.path().join("a/video1.webm"));
        store
            .put(&vidmirror_store::ProgressRecord {
                source_path: PathBuf::from("a/video1.mp4"),
                source_hash: "h".into(),
                source_size: 1,
                source_mtime: 0,
                output_path: PathBuf::from("a/video1.webm"),
                status: vidmirror_store::ConversionStatus::Completed,
                updated_at: chrono::Utc::now(),
            })
            .unwrap();

        let entries = scan_source(src.path()).unwrap();
        let delta = compute_delta(src.path(), &entries, out.path()).unwrap();
        let mut stats = ApplyStats::default();
        apply_removals(&delta, out.path(), &store, &mut stats);

        assert_eq!(stats.removed_files, 1);
        assert!(!out.path().join("a/video1.webm").exists());
        assert!(store
            .get(Path::new("a/video1.mp4"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_apply_removals_deletes_record_of_uppercase_source() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        let store = FlatFileStore::open(state.path()).unwrap();

        touch(&out.path().join("a/CLIP.webm"));
        store
            .put(&vidmirror_store::ProgressRecord {
                source_path: PathBuf::from("a/CLIP.MP4"),
                source_hash: "h".into(),
                source_size: 1,
                source_mtime: 0,
                output_path: PathBuf::from("a/CLIP.webm"),
                status: vidmirror_store::ConversionStatus::Completed,
                updated_at: chrono::Utc::now(),
            })
            .unwrap();

        let entries = scan_source(src.path()).unwrap();
        let delta = compute_delta(src.path(), &entries, out.path()).unwrap();
        let mut stats = ApplyStats::default();
        apply_removals(&delta, out.path(), &store, &mut stats);

        assert!(!out.path().join("a/CLIP.webm").exists());
        assert!(store.get(Path::new("a/CLIP.MP4")).unwrap().is_none());
    }
}
