//! Mutual exclusion and stale-lock recovery at the pass level.

mod common;

use chrono::Utc;
use common::{MockEncoder, TestHarness};
use vidmirror::lock::{LockFile, LockRecord, LockStatus, STALE_AFTER_SECS};
use vidmirror::sync::PassOutcome;

// ---------------------------------------------------------------------------
// A held lock turns a pass away without touching the output tree
// ---------------------------------------------------------------------------

#[test]
fn pass_fails_fast_while_lock_is_held() {
    let harness = TestHarness::new();
    let encoder = MockEncoder::new();

    harness.write_source("a/video1.mp4", b"video");

    let lock = LockFile::new(harness.state.path());
    let guard = lock.acquire().unwrap();

    let report = harness.run(&encoder);
    assert_eq!(report.outcome, PassOutcome::AlreadyRunning);
    assert_eq!(report.outcome.exit_code(), 2);

    // Nothing was created or converted.
    assert_eq!(encoder.calls(), 0);
    assert!(std::fs::read_dir(harness.output.path())
        .unwrap()
        .next()
        .is_none());

    // After release the same pass goes through.
    drop(guard);
    let report = harness.run(&encoder);
    assert_eq!(report.outcome, PassOutcome::Success);
    assert_eq!(report.summary.converted, 1);
}

// ---------------------------------------------------------------------------
// A backdated lock is cleared and the pass proceeds
// ---------------------------------------------------------------------------

#[test]
fn stale_lock_is_cleared_and_pass_proceeds() {
    let harness = TestHarness::new();
    let encoder = MockEncoder::new();

    harness.write_source("clip.mp4", b"video");

    let backdated = LockRecord {
        pid: 99999,
        hostname: "dead-host".to_string(),
        acquired_at: Utc::now() - chrono::Duration::seconds(STALE_AFTER_SECS + 3600),
    };
    std::fs::create_dir_all(harness.state.path()).unwrap();
    std::fs::write(
        harness.state.path().join("sync.lock"),
        serde_json::to_string(&backdated).unwrap(),
    )
    .unwrap();

    let report = harness.run(&encoder);
    assert_eq!(report.outcome, PassOutcome::Success);
    assert_eq!(report.summary.converted, 1);

    // The stale record is gone, and so is the pass's own lock.
    assert!(matches!(
        LockFile::new(harness.state.path()).status(),
        LockStatus::Free
    ));
}

// ---------------------------------------------------------------------------
// The lock is released even when the pass fails fatally
// ---------------------------------------------------------------------------

#[test]
fn lock_released_after_fatal_pass() {
    let harness = TestHarness::new();
    let encoder = MockEncoder::new();

    let mut config = harness.config.clone();
    config.sync.source_root = harness.source.path().join("missing");

    let report = vidmirror::sync::run_pass(&config, &encoder);
    assert_eq!(report.outcome, PassOutcome::Fatal);

    assert!(matches!(
        LockFile::new(harness.state.path()).status(),
        LockStatus::Free
    ));
}
