//! Path utilities for classifying source files and deriving output paths.
//!
//! Video detection is a fixed extension allow-list; anything else is mirrored
//! as an opaque copy. Converted artifacts keep their relative path with the
//! extension swapped to the target container, and are written under a
//! reserved temporary suffix until the conversion commits.

use std::path::{Path, PathBuf};

/// List of source extensions recognized as convertible video.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "flv", "wmv", "m4v", "mpeg", "mpg", "webm", "3gp", "ogv", "ts",
    "m2ts",
];

/// Extension of converted artifacts.
pub const TARGET_EXTENSION: &str = "webm";

/// Suffix marking an artifact that is still being written.
const TEMP_SUFFIX: &str = ".tmp.webm";

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use vidmirror_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("movie.mkv")));
/// assert!(is_video_file(Path::new("/raw/clips/video.MP4")));
/// assert!(!is_video_file(Path::new("notes.txt")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Derive the output-relative path for a source-relative path.
///
/// Videos get their extension replaced with [`TARGET_EXTENSION`]; everything
/// else maps 1:1.
pub fn output_rel_path(source_rel: &Path) -> PathBuf {
    if is_video_file(source_rel) {
        source_rel.with_extension(TARGET_EXTENSION)
    } else {
        source_rel.to_path_buf()
    }
}

/// Temporary path an artifact is written to before the commit rename.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(TEMP_SUFFIX);
    final_path.with_file_name(name)
}

/// Temporary path a verbatim copy is staged at before the commit rename.
///
/// Unlike [`temp_path`] the full file name is kept, so a copy temp for
/// `notes.txt` never collides with the encode temp of a video sharing its
/// stem. Both carry [`TEMP_SUFFIX`] and are swept together.
pub fn copy_temp_path(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(TEMP_SUFFIX);
    final_path.with_file_name(name)
}

/// Check whether a path is a temporary (uncommitted) artifact.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use vidmirror_common::paths::is_temp_artifact;
///
/// assert!(is_temp_artifact(Path::new("clip.tmp.webm")));
/// assert!(!is_temp_artifact(Path::new("clip.webm")));
/// ```
pub fn is_temp_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(TEMP_SUFFIX))
        .unwrap_or(false)
}

/// Get the list of video file extensions.
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}
