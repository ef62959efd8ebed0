//! # vidmirror-av
//!
//! FFmpeg-backed media tooling for vidmirror.
//!
//! This crate provides:
//! - Probing a media file's duration (ffprobe JSON output)
//! - Encoding to streaming-friendly WebM (VP9 + Opus) with progress events
//! - External tool discovery (`ffmpeg`, `ffprobe`)
//!
//! ## Example
//!
//! ```no_run
//! use vidmirror_av::{Encoder, EncodeSettings, FfmpegEncoder};
//! use std::path::Path;
//!
//! let encoder = FfmpegEncoder::new(EncodeSettings::default());
//! encoder.encode(
//!     Path::new("/raw/clip.mp4"),
//!     Path::new("/public/clip.tmp.webm"),
//!     &mut |p| println!("{:.1}%", p.percent.unwrap_or(0.0)),
//! )?;
//! # Ok::<(), vidmirror_av::Error>(())
//! ```

mod encode;
mod error;
pub mod probe;
pub mod tools;

pub use encode::{EncodeSettings, Encoder, FfmpegEncoder, Progress};
pub use error::{Error, Result};
pub use probe::probe_duration;
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
