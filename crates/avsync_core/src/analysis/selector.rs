//! Estimator selection policy.
//!
//! Runs every estimator on the same signal pair and picks the candidate
//! with the higher confidence. Disagreement between methods and weak
//! winning scores are reported as warnings, never as errors: the caller
//! always gets a best-effort decision and decides whether to proceed.

use crate::analysis::methods::OffsetEstimator;
use crate::analysis::types::{
    AudioSignal, EstimationMethod, OffsetCandidate, SyncDecision, SyncWarning,
};
use crate::config::SelectionSettings;

/// Thresholds for the selection policy.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Winning confidence below this sets `LowConfidence`.
    pub low_confidence_threshold: f64,
    /// Candidates whose offsets differ by more than this (seconds) are
    /// considered to disagree.
    pub agreement_tolerance_secs: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.3,
            agreement_tolerance_secs: 0.25,
        }
    }
}

impl From<&SelectionSettings> for SelectionConfig {
    fn from(settings: &SelectionSettings) -> Self {
        Self {
            low_confidence_threshold: settings.low_confidence_threshold,
            agreement_tolerance_secs: settings.agreement_tolerance_secs,
        }
    }
}

/// Run all estimators and select a final decision.
///
/// Never fails: an estimator error is logged and degraded to a
/// zero-confidence candidate so the other method can still win.
pub fn estimate_offset(
    video_audio: &AudioSignal,
    replacement: &AudioSignal,
    estimators: &[Box<dyn OffsetEstimator>],
    config: &SelectionConfig,
) -> SyncDecision {
    let candidates: Vec<OffsetCandidate> = estimators
        .iter()
        .map(|est| match est.estimate(video_audio, replacement) {
            Ok(candidate) => {
                tracing::info!(
                    "{}: {:+.3}s (confidence {:.2})",
                    est.name(),
                    candidate.offset_secs,
                    candidate.confidence
                );
                candidate
            }
            Err(e) => {
                tracing::warn!("{} estimator failed: {}", est.name(), e);
                OffsetCandidate::degenerate(est.method())
            }
        })
        .collect();

    select_candidate(&candidates, config)
}

/// Select the final decision from a set of candidates.
///
/// The strictly higher confidence wins; on an exact tie the earlier
/// candidate keeps the slot, and the default estimator order puts the
/// sample-precise waveform method first.
pub fn select_candidate(candidates: &[OffsetCandidate], config: &SelectionConfig) -> SyncDecision {
    let Some(&first) = candidates.first() else {
        return SyncDecision {
            offset_secs: 0.0,
            method: EstimationMethod::Waveform,
            confidence: 0.0,
            warning: Some(SyncWarning::LowConfidence),
        };
    };

    let mut winner = first;
    for &candidate in &candidates[1..] {
        if candidate.confidence > winner.confidence {
            winner = candidate;
        }
    }

    // Zero-confidence candidates (silence, failed estimator) carry no
    // offset information and cannot meaningfully disagree.
    let methods_disagree = candidates.iter().any(|c| {
        c.confidence > 0.0
            && (c.offset_secs - winner.offset_secs).abs() > config.agreement_tolerance_secs
    });

    let warning = if winner.confidence < config.low_confidence_threshold {
        // Stronger signal than a mismatch: the recordings may not even be
        // the same performance.
        Some(SyncWarning::LowConfidence)
    } else if methods_disagree {
        Some(SyncWarning::MethodMismatch)
    } else {
        None
    };

    SyncDecision {
        offset_secs: winner.offset_secs,
        method: winner.method,
        confidence: winner.confidence,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(offset: f64, confidence: f64, method: EstimationMethod) -> OffsetCandidate {
        OffsetCandidate::new(offset, confidence, method)
    }

    #[test]
    fn picks_higher_confidence() {
        let candidates = vec![
            candidate(1.0, 0.6, EstimationMethod::Waveform),
            candidate(1.05, 0.8, EstimationMethod::Chromagram),
        ];

        let decision = select_candidate(&candidates, &SelectionConfig::default());

        assert_eq!(decision.method, EstimationMethod::Chromagram);
        assert_eq!(decision.confidence, 0.8);
        assert!(decision.warning.is_none());
    }

    #[test]
    fn disagreement_sets_method_mismatch() {
        let candidates = vec![
            candidate(2.0, 0.4, EstimationMethod::Waveform),
            candidate(0.9, 0.9, EstimationMethod::Chromagram),
        ];

        let decision = select_candidate(&candidates, &SelectionConfig::default());

        assert_eq!(decision.confidence, 0.9);
        assert!((decision.offset_secs - 0.9).abs() < 1e-9);
        assert_eq!(decision.warning, Some(SyncWarning::MethodMismatch));
    }

    #[test]
    fn agreement_within_tolerance_has_no_warning() {
        let candidates = vec![
            candidate(1.50, 0.9, EstimationMethod::Waveform),
            candidate(1.55, 0.7, EstimationMethod::Chromagram),
        ];

        let decision = select_candidate(&candidates, &SelectionConfig::default());

        assert_eq!(decision.method, EstimationMethod::Waveform);
        assert!(decision.warning.is_none());
    }

    #[test]
    fn weak_winner_sets_low_confidence() {
        let candidates = vec![
            candidate(1.0, 0.1, EstimationMethod::Waveform),
            candidate(1.02, 0.2, EstimationMethod::Chromagram),
        ];

        let decision = select_candidate(&candidates, &SelectionConfig::default());

        assert_eq!(decision.warning, Some(SyncWarning::LowConfidence));
    }

    #[test]
    fn low_confidence_takes_precedence_over_mismatch() {
        let candidates = vec![
            candidate(5.0, 0.05, EstimationMethod::Waveform),
            candidate(0.0, 0.15, EstimationMethod::Chromagram),
        ];

        let decision = select_candidate(&candidates, &SelectionConfig::default());

        assert_eq!(decision.warning, Some(SyncWarning::LowConfidence));
    }

    #[test]
    fn degenerate_candidate_does_not_trigger_mismatch() {
        // A silent or failed estimator degrades to {0.0s, confidence 0};
        // its offset is not a real disagreement with the winner.
        let candidates = vec![
            candidate(5.0, 0.9, EstimationMethod::Waveform),
            OffsetCandidate::degenerate(EstimationMethod::Chromagram),
        ];

        let decision = select_candidate(&candidates, &SelectionConfig::default());

        assert_eq!(decision.method, EstimationMethod::Waveform);
        assert!((decision.offset_secs - 5.0).abs() < 1e-9);
        assert!(decision.warning.is_none());
    }

    #[test]
    fn exact_tie_keeps_first_candidate() {
        let candidates = vec![
            candidate(1.0, 0.7, EstimationMethod::Waveform),
            candidate(3.0, 0.7, EstimationMethod::Chromagram),
        ];

        let decision = select_candidate(&candidates, &SelectionConfig::default());

        assert_eq!(decision.method, EstimationMethod::Waveform);
    }

    #[test]
    fn empty_candidates_degrade_to_low_confidence_zero() {
        let decision = select_candidate(&[], &SelectionConfig::default());

        assert_eq!(decision.offset_secs, 0.0);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.warning, Some(SyncWarning::LowConfidence));
    }

    #[test]
    fn thresholds_come_from_config() {
        let strict = SelectionConfig {
            low_confidence_threshold: 0.95,
            agreement_tolerance_secs: 0.25,
        };
        let candidates = vec![
            candidate(1.0, 0.9, EstimationMethod::Waveform),
            candidate(1.0, 0.5, EstimationMethod::Chromagram),
        ];

        let decision = select_candidate(&candidates, &strict);
        assert_eq!(decision.warning, Some(SyncWarning::LowConfidence));
    }
}
