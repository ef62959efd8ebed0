//! WebM (VP9 + Opus) encoding with progress reporting.

use crate::{probe_duration, Error, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

/// Minimum interval between progress callbacks.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// How much of the encoder's stderr to keep for error reporting.
const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// Settings for visually-lossless constant-quality WebM encoding.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    /// Maximum output width; sources are never upscaled (default: 1920).
    pub max_width: u32,
    /// Maximum output height; sources are never upscaled (default: 1080).
    pub max_height: u32,
    /// VP9 constant rate factor, lower is higher quality (default: 23).
    pub crf: u32,
    /// Opus audio bitrate (default: 192k).
    pub audio_bitrate: String,
    /// VP9 cpu-used speed/quality trade-off, 0-5 (default: 2).
    pub cpu_used: u32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            crf: 23,
            audio_bitrate: "192k".to_string(),
            cpu_used: 2,
        }
    }
}

/// A single progress event during an encode.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    /// Output position reached so far.
    pub position: Duration,
    /// Completion percentage, when the source duration is known.
    pub percent: Option<f32>,
    /// Estimated time remaining, when the source duration is known.
    pub eta: Option<Duration>,
}

/// Capability interface for producing one output artifact from one source.
///
/// Implementations must write exclusively to `temp_output`; the caller owns
/// the commit rename. On failure the implementation reports the error and
/// the caller purges the temporary file.
pub trait Encoder {
    fn encode(
        &self,
        input: &Path,
        temp_output: &Path,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<()>;
}

/// [`Encoder`] backed by the ffmpeg CLI.
pub struct FfmpegEncoder {
    settings: EncodeSettings,
}

impl FfmpegEncoder {
    /// Create an encoder with the given settings.
    pub fn new(settings: EncodeSettings) -> Self {
        Self { settings }
    }

    fn build_args(&self, input: &Path, temp_output: &Path) -> Vec<String> {
        let s = &self.settings;
        vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-y".to_string(),
            // Machine-readable progress on stdout, stats off stderr
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
            // Cap resolution, keep aspect ratio, never upscale, even dimensions
            "-vf".to_string(),
            format!(
                "scale=trunc(min(iw\\,{})/2)*2:trunc(min(ih\\,{})/2)*2",
                s.max_width, s.max_height
            ),
            // VP9 constant-quality mode
            "-c:v".to_string(),
            "libvpx-vp9".to_string(),
            "-b:v".to_string(),
            "0".to_string(),
            "-crf".to_string(),
            s.crf.to_string(),
            // Opus audio
            "-c:a".to_string(),
            "libopus".to_string(),
            "-b:a".to_string(),
            s.audio_bitrate.clone(),
            // Throughput: row-based multithreading across all cores
            "-cpu-used".to_string(),
            s.cpu_used.to_string(),
            "-row-mt".to_string(),
            "1".to_string(),
            "-threads".to_string(),
            "0".to_string(),
            "-deadline".to_string(),
            "good".to_string(),
            "-auto-alt-ref".to_string(),
            "1".to_string(),
            "-lag-in-frames".to_string(),
            "25".to_string(),
            "-f".to_string(),
            "webm".to_string(),
            temp_output.to_string_lossy().to_string(),
        ]
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(
        &self,
        input: &Path,
        temp_output: &Path,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<()> {
        // Duration is only needed for percent/ETA; a probe failure must not
        // block the encode itself.
        let duration = match probe_duration(input) {
            Ok(d) => d,
            Err(e) => {
                debug!("Duration probe failed for {:?}: {}", input, e);
                None
            }
        };

        let args = self.build_args(input, temp_output);
        debug!("FFmpeg args: {:?}", args);

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found("ffmpeg")
                } else {
                    Error::Io(e)
                }
            })?;

        // Drain stderr on its own thread so a chatty encoder can't block
        // against a full pipe while we read progress from stdout.
        let mut stderr = child.stderr.take().expect("stderr was piped");
        let stderr_thread = std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        let stdout = child.stdout.take().expect("stdout was piped");
        let reader = BufReader::new(stdout);

        let start = Instant::now();
        let mut last_emit: Option<Instant> = None;

        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };

            let Some(position) = parse_out_time(line.trim()) else {
                continue;
            };

            if last_emit.is_some_and(|t| t.elapsed() < PROGRESS_INTERVAL) {
                continue;
            }
            last_emit = Some(Instant::now());

            on_progress(make_progress(position, duration, start.elapsed()));
        }

        let status = child.wait()?;
        let stderr_text = stderr_thread.join().unwrap_or_default();

        if !status.success() {
            let mut tail_start = stderr_text.len().saturating_sub(STDERR_TAIL_BYTES);
            while !stderr_text.is_char_boundary(tail_start) {
                tail_start += 1;
            }
            return Err(Error::tool_failed(
                "ffmpeg",
                format!("exit {}: {}", status, &stderr_text[tail_start..]),
            ));
        }

        Ok(())
    }
}

/// Parse an `out_time_ms=` progress line into an output position.
///
/// Despite the name, ffmpeg reports this field in microseconds.
fn parse_out_time(line: &str) -> Option<Duration> {
    let value = line.strip_prefix("out_time_ms=")?;
    let micros: i64 = value.trim().parse().ok()?;
    if micros < 0 {
        return None;
    }
    Some(Duration::from_micros(micros as u64))
}

fn make_progress(position: Duration, duration: Option<Duration>, elapsed: Duration) -> Progress {
    let percent = duration.map(|d| {
        let pct = (position.as_secs_f32() / d.as_secs_f32()) * 100.0;
        pct.min(100.0)
    });

    let eta = percent.filter(|p| *p > 0.0).map(|p| {
        let remaining = (elapsed.as_secs_f32() / p) * (100.0 - p);
        Duration::from_secs_f32(remaining.max(0.0))
    });

    Progress {
        position,
        percent,
        eta,
    }
}
