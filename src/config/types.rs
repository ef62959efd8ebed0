use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub encoding: EncodingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Source tree; logically read-only.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Output tree; exclusively owned by the sync engine.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Where progress records and the lock file live.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("files/raw")
}
fn default_output_root() -> PathBuf {
    PathBuf::from("files/public")
}
fn default_state_dir() -> PathBuf {
    PathBuf::from(".vidmirror")
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            output_root: default_output_root(),
            state_dir: default_state_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncodingConfig {
    /// Maximum output width (no upscaling).
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// Maximum output height (no upscaling).
    #[serde(default = "default_max_height")]
    pub max_height: u32,

    /// VP9 constant rate factor.
    #[serde(default = "default_crf")]
    pub crf: u32,

    /// Opus audio bitrate.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// VP9 cpu-used speed/quality trade-off (0-5).
    #[serde(default = "default_cpu_used")]
    pub cpu_used: u32,
}

fn default_max_width() -> u32 {
    1920
}
fn default_max_height() -> u32 {
    1080
}
fn default_crf() -> u32 {
    23
}
fn default_audio_bitrate() -> String {
    "192k".to_string()
}
fn default_cpu_used() -> u32 {
    2
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            max_height: default_max_height(),
            crf: default_crf(),
            audio_bitrate: default_audio_bitrate(),
            cpu_used: default_cpu_used(),
        }
    }
}

impl From<&EncodingConfig> for vidmirror_av::EncodeSettings {
    fn from(c: &EncodingConfig) -> Self {
        Self {
            max_width: c.max_width,
            max_height: c.max_height,
            crf: c.crf,
            audio_bitrate: c.audio_bitrate.clone(),
            cpu_used: c.cpu_used,
        }
    }
}
