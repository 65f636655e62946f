//! Offset estimation between a video's embedded audio and a replacement track.
//!
//! # Architecture
//!
//! The analysis pipeline is a set of pure pieces composed by `pipeline::run`:
//!
//! 1. **Extraction** (`ffmpeg`): decode each source's audio to mono f64
//!    samples at a low analysis sample rate, peak-normalized.
//!
//! 2. **Estimation** (`methods`): two independent `OffsetEstimator`
//!    implementations - raw-waveform cross-correlation (sample-precise) and
//!    pitch-chromagram correlation (robust to EQ/processing) - each produce
//!    an `OffsetCandidate` in the same offset unit.
//!
//! 3. **Selection** (`selector`): compare candidate confidences, attach
//!    `LowConfidence`/`MethodMismatch` warnings, emit one `SyncDecision`.
//!
//! # Example
//!
//! ```ignore
//! use avsync_core::analysis::{
//!     default_estimators, estimate_offset, extract_audio, ChromaConfig, SelectionConfig,
//! };
//!
//! let video_audio = extract_audio(video_path, 22050, Some(40.0))?;
//! let replacement = extract_audio(audio_path, 22050, Some(40.0))?;
//!
//! let estimators = default_estimators(&ChromaConfig::default());
//! let decision = estimate_offset(
//!     &video_audio,
//!     &replacement,
//!     &estimators,
//!     &SelectionConfig::default(),
//! );
//! ```

mod ffmpeg;
pub mod methods;
mod selector;
pub mod types;

// Re-export main types from types module
pub use types::{
    AnalysisError, AnalysisResult, AudioSignal, ChromaSequence, EstimationMethod, OffsetCandidate,
    SyncDecision, SyncWarning, PITCH_CLASSES,
};

// Re-export FFmpeg functions
pub use ffmpeg::{
    check_ffmpeg, extract_audio, get_duration, DEFAULT_ANALYSIS_SAMPLE_RATE,
    DEFAULT_ANALYZE_DURATION_SECS,
};

// Re-export estimator trait, implementations, and factory functions
pub use methods::{
    available_estimators, compute_chromagram, create_estimator, default_estimators, ChromaConfig,
    ChromaEstimator, OffsetEstimator, WaveformEstimator,
};

// Re-export selection
pub use selector::{estimate_offset, select_candidate, SelectionConfig};
