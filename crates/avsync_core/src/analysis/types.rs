//! Core types for offset estimation.

use serde::Serialize;

/// Number of pitch classes in a chroma frame (one per semitone).
pub const PITCH_CLASSES: usize = 12;

/// Mono audio extracted from a source file at the analysis sample rate.
#[derive(Debug, Clone)]
pub struct AudioSignal {
    /// Audio samples as f64, mono.
    pub samples: Vec<f64>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioSignal {
    /// Create a new signal from samples.
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the signal is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds, derived from length and sample rate.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Mean energy per sample.
    pub fn mean_energy(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|x| x * x).sum::<f64>() / self.samples.len() as f64
    }

    /// Resample to the target rate with linear interpolation.
    ///
    /// Correlators require both inputs at the same rate; extraction already
    /// resamples via ffmpeg, so this only covers signals built elsewhere.
    pub fn resampled(&self, target_rate: u32) -> AudioSignal {
        if target_rate == self.sample_rate || self.samples.is_empty() {
            return AudioSignal::new(self.samples.clone(), target_rate);
        }

        let ratio = self.sample_rate as f64 / target_rate as f64;
        let out_len = ((self.samples.len() as f64) / ratio).floor() as usize;
        let mut out = Vec::with_capacity(out_len.max(1));

        for i in 0..out_len.max(1) {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = pos - idx as f64;
            let a = self.samples.get(idx).copied().unwrap_or(0.0);
            let b = self.samples.get(idx + 1).copied().unwrap_or(a);
            out.push(a + (b - a) * frac);
        }

        AudioSignal::new(out, target_rate)
    }
}

/// A time series of pitch-class energy vectors at a fixed hop duration.
#[derive(Debug, Clone)]
pub struct ChromaSequence {
    /// One 12-bin vector per analysis frame, mean-centered and
    /// L2-normalized (silent or flat-profile frames stay all-zero).
    pub frames: Vec<[f64; PITCH_CLASSES]>,
    /// Time between consecutive frames in seconds.
    pub hop_secs: f64,
}

impl ChromaSequence {
    /// Create a new chroma sequence.
    pub fn new(frames: Vec<[f64; PITCH_CLASSES]>, hop_secs: f64) -> Self {
        Self { frames, hop_secs }
    }

    /// Get the number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if the sequence has no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Check whether every frame is silent (all-zero).
    pub fn is_silent(&self) -> bool {
        self.frames
            .iter()
            .all(|f| f.iter().all(|&v| v.abs() < 1e-12))
    }
}

/// Which estimator produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationMethod {
    /// Raw-waveform cross-correlation (sample-level precision).
    Waveform,
    /// Pitch-class feature correlation (robust to EQ and processing).
    Chromagram,
}

impl std::fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimationMethod::Waveform => write!(f, "waveform"),
            EstimationMethod::Chromagram => write!(f, "chromagram"),
        }
    }
}

/// One estimator's best offset guess.
///
/// Sign convention (used everywhere in this crate): a positive offset means
/// the video's timeline leads - the shared content appears `offset_secs`
/// later in the video than in the replacement audio - so the video gets
/// trimmed at its start. Negative means the replacement audio leads.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OffsetCandidate {
    /// Signed offset in seconds.
    pub offset_secs: f64,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Estimator that produced this candidate.
    pub method: EstimationMethod,
}

impl OffsetCandidate {
    /// Create a new candidate, clamping confidence into [0, 1].
    pub fn new(offset_secs: f64, confidence: f64, method: EstimationMethod) -> Self {
        Self {
            offset_secs,
            confidence: confidence.clamp(0.0, 1.0),
            method,
        }
    }

    /// The zero-information candidate used for silent or failed estimates.
    pub fn degenerate(method: EstimationMethod) -> Self {
        Self {
            offset_secs: 0.0,
            confidence: 0.0,
            method,
        }
    }
}

/// Non-fatal caveats attached to a sync decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncWarning {
    /// Winning confidence is below the configured threshold; the two
    /// recordings may not be the same performance.
    LowConfidence,
    /// The two estimators disagree beyond the configured tolerance.
    MethodMismatch,
}

impl std::fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncWarning::LowConfidence => {
                write!(f, "low confidence - sync may be inaccurate")
            }
            SyncWarning::MethodMismatch => {
                write!(f, "estimation methods disagree - result may be wrong")
            }
        }
    }
}

/// Final output of the selector.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SyncDecision {
    /// Chosen signed offset in seconds.
    pub offset_secs: f64,
    /// Method the winning candidate came from.
    pub method: EstimationMethod,
    /// Winning candidate's confidence.
    pub confidence: f64,
    /// Warning attached to the decision, if any.
    pub warning: Option<SyncWarning>,
}

/// Error types for extraction and estimation.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// FFmpeg execution failed.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// Audio extraction produced no usable samples.
    #[error("Audio extraction failed: {0}")]
    ExtractionError(String),

    /// Source file not found.
    #[error("Source file not found: {0}")]
    SourceNotFound(String),

    /// Invalid audio data.
    #[error("Invalid audio data: {0}")]
    InvalidAudio(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Type alias for analysis results.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
