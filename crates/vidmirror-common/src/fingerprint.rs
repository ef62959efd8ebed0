//! Content fingerprinting and stable path keys.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// How many leading bytes of a file the fingerprint covers (10 MiB).
pub const FINGERPRINT_PREFIX_BYTES: u64 = 10 * 1024 * 1024;

/// Compute the content fingerprint of a file: a SHA-256 digest over at most
/// the first [`FINGERPRINT_PREFIX_BYTES`] bytes, hex encoded.
///
/// Bounding the read keeps hashing cost independent of file size for large
/// videos. The trade-off: a change confined to bytes beyond the prefix is
/// invisible to the fingerprint and is only caught if size or mtime move too.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = file.take(FINGERPRINT_PREFIX_BYTES);

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Stable identity key for a source-relative path.
///
/// Records in the metadata store are addressed by this key, so lookups never
/// require rehashing file content or scanning the store directory.
pub fn path_key(rel_path: &Path) -> String {
    // Normalize separators so the key is identical across platforms.
    let normalized: String = rel_path
        .to_string_lossy()
        .chars()
        .map(|c| if c == '\\' { '/' } else { c })
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fingerprint_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.bin");

        std::fs::write(&path, b"hello").unwrap();
        let a = fingerprint_file(&path).unwrap();

        std::fs::write(&path, b"world").unwrap();
        let b = fingerprint_file(&path).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_ignores_bytes_past_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");

        let prefix = vec![0xAB; FINGERPRINT_PREFIX_BYTES as usize];
        let mut f = File::create(&path).unwrap();
        f.write_all(&prefix).unwrap();
        f.write_all(b"tail-one").unwrap();
        drop(f);
        let a = fingerprint_file(&path).unwrap();

        let mut f = File::create(&path).unwrap();
        f.write_all(&prefix).unwrap();
        f.write_all(b"tail-two").unwrap();
        drop(f);
        let b = fingerprint_file(&path).unwrap();

        // Known weak-detection trade-off: only the prefix is hashed.
        assert_eq!(a, b);
    }

    #[test]
    fn test_path_key_stable_across_separators() {
        let a = path_key(Path::new("a/video1.mp4"));
        let b = path_key(Path::new("a\\video1.mp4"));
        assert_eq!(a, b);
        assert_ne!(a, path_key(Path::new("a/video2.mp4")));
    }
}
