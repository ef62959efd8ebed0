//! Per-file conversion and mirroring.
//!
//! The worker turns one source entry into one output artifact: videos are
//! transcoded to WebM through the [`vidmirror_av::Encoder`] seam, everything
//! else is copied verbatim. Artifacts are only ever written to a temporary
//! path and committed with an atomic rename, so a reader of the output tree
//! can never open a half-written file at its final path.

mod worker;

pub use worker::{ConversionWorker, FileOutcome};
