//! # vidmirror-common
//!
//! Shared leaf utilities for vidmirror: file-type classification by
//! extension, output/temporary path derivation, and content fingerprinting.

pub mod fingerprint;
pub mod paths;

pub use fingerprint::{fingerprint_file, path_key, FINGERPRINT_PREFIX_BYTES};
pub use paths::{
    copy_temp_path, is_temp_artifact, is_video_file, output_rel_path, temp_path, TARGET_EXTENSION,
};
