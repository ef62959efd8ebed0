//! Vidmirror - resumable sync-and-convert engine
//!
//! Mirrors a source ("raw") directory tree into an output ("public") tree,
//! transcoding videos to streaming-friendly WebM and copying everything else
//! verbatim. Safe to re-invoke from a periodic scheduler: passes are gated by
//! a single-instance lock, per-file state is fingerprint-tracked, and
//! artifacts only become visible through an atomic rename.
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod conversion;
pub mod differ;
pub mod lock;
pub mod scanner;
pub mod sync;
