//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] (tempdir-backed source/output/state trees plus a
//! ready-made [`Config`]) and [`MockEncoder`], an [`Encoder`] that writes
//! deterministic bytes instead of invoking ffmpeg, so passes run without
//! external tools.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;
use vidmirror::config::Config;
use vidmirror::sync::{self, PassReport};
use vidmirror_av::{Encoder, Progress};
use vidmirror_store::FlatFileStore;

/// Test harness wrapping source, output, and state tempdirs.
pub struct TestHarness {
    pub source: TempDir,
    pub output: TempDir,
    pub state: TempDir,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Self {
        let source = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();

        let mut config = Config::default();
        config.sync.source_root = source.path().to_path_buf();
        config.sync.output_root = output.path().to_path_buf();
        config.sync.state_dir = state.path().to_path_buf();

        Self {
            source,
            output,
            state,
            config,
        }
    }

    /// Write a file (creating parents) under the source root.
    pub fn write_source(&self, rel: &str, contents: &[u8]) {
        let path = self.source.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Delete a file under the source root.
    pub fn remove_source(&self, rel: &str) {
        fs::remove_file(self.source.path().join(rel)).unwrap();
    }

    /// Absolute path under the output root.
    pub fn out_path(&self, rel: &str) -> PathBuf {
        self.output.path().join(rel)
    }

    /// Open the progress store the engine uses.
    pub fn store(&self) -> FlatFileStore {
        FlatFileStore::open(self.state.path().join("progress")).unwrap()
    }

    /// Run one pass with the given encoder.
    pub fn run(&self, encoder: &dyn Encoder) -> PassReport {
        sync::run_pass(&self.config, encoder)
    }
}

/// Encoder stand-in: copies the source bytes into the temp output with a
/// marker prefix, counts invocations, and can be told to fail.
pub struct MockEncoder {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Make subsequent encodes fail after writing a partial temp file.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// How many encodes have been attempted.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Encoder for MockEncoder {
    fn encode(
        &self,
        input: &Path,
        temp_output: &Path,
        on_progress: &mut dyn FnMut(Progress),
    ) -> vidmirror_av::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            // A failed encode typically leaves partial bytes behind.
            fs::write(temp_output, b"partial")?;
            return Err(vidmirror_av::Error::tool_failed("ffmpeg", "exit 1: boom"));
        }

        let source = fs::read(input)?;
        let mut artifact = b"WEBM:".to_vec();
        artifact.extend_from_slice(&source);
        fs::write(temp_output, artifact)?;

        on_progress(Progress {
            position: std::time::Duration::from_secs(1),
            percent: Some(100.0),
            eta: Some(std::time::Duration::ZERO),
        });

        Ok(())
    }
}
