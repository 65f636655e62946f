//! avsync core - offset estimation and merge planning.
//!
//! Estimates the constant time offset between the audio embedded in a video
//! file and a separately recorded replacement track, then plans and executes
//! a synced, trimmed merge via FFmpeg. All business logic lives here with no
//! CLI dependencies; `avsync_cli` is a thin wrapper.

pub mod analysis;
pub mod config;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod plan;

pub use pipeline::{analyze, run, SyncError, SyncOutcome};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
