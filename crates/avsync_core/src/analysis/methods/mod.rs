//! Offset estimators.
//!
//! This module defines the `OffsetEstimator` trait and its implementations.
//! Every estimator takes the same pair of signals and returns a candidate in
//! the same offset unit, so the selector can compare them uniformly and a
//! new estimation method (e.g. onset-based) is a matter of adding a variant.

mod chroma;
mod waveform;

pub use chroma::{compute_chromagram, ChromaConfig, ChromaEstimator};
pub use waveform::WaveformEstimator;

use crate::analysis::types::{AnalysisResult, AudioSignal, EstimationMethod, OffsetCandidate};

/// Trait for offset estimation methods.
///
/// Implementations compare the video's embedded audio against the
/// replacement track and report the signed offset between them.
pub trait OffsetEstimator: Send + Sync {
    /// Name of this estimator.
    fn name(&self) -> &'static str;

    /// Which method enum variant this estimator reports.
    fn method(&self) -> EstimationMethod;

    /// Estimate the offset between the video's audio and the replacement.
    ///
    /// Positive offset means the video leads (the shared content appears
    /// later in the video); negative means the replacement audio leads.
    fn estimate(
        &self,
        video_audio: &AudioSignal,
        replacement: &AudioSignal,
    ) -> AnalysisResult<OffsetCandidate>;
}

/// Create an estimator by name.
pub fn create_estimator(
    name: &str,
    chroma_config: &ChromaConfig,
) -> Option<Box<dyn OffsetEstimator>> {
    match name.to_lowercase().as_str() {
        "waveform" | "raw" => Some(Box::new(WaveformEstimator::new())),
        "chroma" | "chromagram" => Some(Box::new(ChromaEstimator::new(chroma_config.clone()))),
        _ => None,
    }
}

/// The standard estimator set, run and compared by the selector.
pub fn default_estimators(chroma_config: &ChromaConfig) -> Vec<Box<dyn OffsetEstimator>> {
    vec![
        Box::new(WaveformEstimator::new()),
        Box::new(ChromaEstimator::new(chroma_config.clone())),
    ]
}

/// Get a list of available estimator names.
pub fn available_estimators() -> Vec<&'static str> {
    vec!["waveform", "chromagram"]
}

/// Pick the best lag from a correlation-like score sequence.
///
/// `scores` holds (lag, score) pairs. Returns the pair with the maximum
/// score; ties within floating-point tolerance break toward the smallest
/// absolute lag, preferring the minimal assumed offset.
pub(crate) fn pick_peak(scores: impl Iterator<Item = (isize, f64)>) -> Option<(isize, f64)> {
    const TIE_EPSILON: f64 = 1e-9;

    let mut best: Option<(isize, f64)> = None;
    for (lag, score) in scores {
        if !score.is_finite() {
            continue;
        }
        match best {
            None => best = Some((lag, score)),
            Some((best_lag, best_score)) => {
                if score > best_score + TIE_EPSILON {
                    best = Some((lag, score));
                } else if (score - best_score).abs() <= TIE_EPSILON && lag.abs() < best_lag.abs() {
                    best = Some((lag, score));
                }
            }
        }
    }
    best
}
