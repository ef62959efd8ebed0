//! Flat-file JSON backend: one record per file, named by path key.

use crate::{Error, ProgressRecord, ProgressStore, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use vidmirror_common::fingerprint::path_key;

/// Stores each [`ProgressRecord`] as `<dir>/<path_key>.json`.
///
/// `put` writes to a sibling temp file and renames it into place, so a
/// record file is either the previous version or the new one, never a torn
/// write.
pub struct FlatFileStore {
    dir: PathBuf,
}

impl FlatFileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| Error::Directory {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn record_path(&self, rel_path: &Path) -> PathBuf {
        self.dir.join(format!("{}.json", path_key(rel_path)))
    }
}

impl ProgressStore for FlatFileStore {
    fn get(&self, rel_path: &Path) -> Result<Option<ProgressRecord>> {
        let path = self.record_path(rel_path);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn put(&self, record: &ProgressRecord) -> Result<()> {
        let path = self.record_path(&record.source_path);
        let tmp = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, rel_path: &Path) -> Result<()> {
        let path = self.record_path(rel_path);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_all(&self) -> Result<Vec<ProgressRecord>> {
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            // A single corrupt record must not take down the whole listing.
            match fs::read_to_string(&path)
                .map_err(Error::from)
                .and_then(|s| serde_json::from_str(&s).map_err(Error::from))
            {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping unreadable progress record {:?}: {}", path, e);
                }
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConversionStatus;
    use chrono::Utc;

    fn record(rel: &str) -> ProgressRecord {
        ProgressRecord {
            source_path: PathBuf::from(rel),
            source_hash: "abc123".to_string(),
            source_size: 42,
            source_mtime: 1_700_000_000,
            output_path: PathBuf::from(rel).with_extension("webm"),
            status: ConversionStatus::InProgress,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::open(dir.path()).unwrap();

        let rec = record("a/video1.mp4");
        store.put(&rec).unwrap();

        let loaded = store.get(Path::new("a/video1.mp4")).unwrap().unwrap();
        assert_eq!(loaded, rec);
    }

    #[test]
    fn test_get_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::open(dir.path()).unwrap();
        assert!(store.get(Path::new("nope.mp4")).unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites_same_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::open(dir.path()).unwrap();

        let mut rec = record("a/video1.mp4");
        store.put(&rec).unwrap();

        rec.status = ConversionStatus::Completed;
        rec.source_hash = "def456".to_string();
        store.put(&rec).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, ConversionStatus::Completed);
        assert_eq!(all[0].source_hash, "def456");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::open(dir.path()).unwrap();

        store.put(&record("a/video1.mp4")).unwrap();
        store.delete(Path::new("a/video1.mp4")).unwrap();
        store.delete(Path::new("a/video1.mp4")).unwrap();
        assert!(store.get(Path::new("a/video1.mp4")).unwrap().is_none());
    }

    #[test]
    fn test_list_all_skips_corrupt_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::open(dir.path()).unwrap();

        store.put(&record("a/video1.mp4")).unwrap();
        store.put(&record("a/video2.mp4")).unwrap();
        fs::write(dir.path().join("garbage.json"), "{not json").unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 2);
    }
}
