//! Raw-waveform cross-correlation estimator.
//!
//! Uses FFT-based cross-correlation via the convolution theorem:
//! corr(a,b) = IFFT(FFT(a) * conj(FFT(b))). Precise to the sample when the
//! two recordings have similar timbre; degrades when one side went through
//! heavy EQ or compression (that case is the chroma estimator's job).

use rustfft::{num_complex::Complex, FftPlanner};

use crate::analysis::types::{
    AnalysisError, AnalysisResult, AudioSignal, EstimationMethod, OffsetCandidate,
};

use super::{pick_peak, OffsetEstimator};

/// Energy floor below which a signal counts as silence.
const SILENCE_ENERGY: f64 = 1e-10;

/// Cross-correlation of raw sample sequences.
pub struct WaveformEstimator;

impl WaveformEstimator {
    /// Create a new waveform estimator.
    pub fn new() -> Self {
        Self
    }

    /// Compute the normalized cross-correlation over the full overlap range.
    ///
    /// Returns (lag, value) pairs for every lag in
    /// `-(other.len()-1) ..= reference.len()-1`, normalized by the combined
    /// signal energy so that perfect self-alignment scores 1.0.
    fn cross_correlation(&self, reference: &[f64], other: &[f64]) -> Vec<(isize, f64)> {
        let correlation_len = reference.len() + other.len() - 1;
        let fft_len = correlation_len.next_power_of_two();

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_len);
        let ifft = planner.plan_fft_inverse(fft_len);

        let mut ref_complex: Vec<Complex<f64>> =
            reference.iter().map(|&x| Complex::new(x, 0.0)).collect();
        ref_complex.resize(fft_len, Complex::new(0.0, 0.0));

        let mut other_complex: Vec<Complex<f64>> =
            other.iter().map(|&x| Complex::new(x, 0.0)).collect();
        other_complex.resize(fft_len, Complex::new(0.0, 0.0));

        fft.process(&mut ref_complex);
        fft.process(&mut other_complex);

        // Correlation in the frequency domain: ref * conj(other)
        let mut product: Vec<Complex<f64>> = ref_complex
            .iter()
            .zip(other_complex.iter())
            .map(|(a, b)| a * b.conj())
            .collect();

        ifft.process(&mut product);

        let ref_energy: f64 = reference.iter().map(|x| x * x).sum();
        let other_energy: f64 = other.iter().map(|x| x * x).sum();
        let norm = (ref_energy * other_energy).sqrt().max(1e-12);
        let scale = 1.0 / (fft_len as f64 * norm);

        // IFFT index k holds lag k; negative lags wrap around the end.
        let mut scores = Vec::with_capacity(correlation_len);
        for lag in -(other.len() as isize - 1)..=(reference.len() as isize - 1) {
            let idx = lag.rem_euclid(fft_len as isize) as usize;
            scores.push((lag, product[idx].re * scale));
        }
        scores
    }
}

impl Default for WaveformEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl OffsetEstimator for WaveformEstimator {
    fn name(&self) -> &'static str {
        "waveform"
    }

    fn method(&self) -> EstimationMethod {
        EstimationMethod::Waveform
    }

    fn estimate(
        &self,
        video_audio: &AudioSignal,
        replacement: &AudioSignal,
    ) -> AnalysisResult<OffsetCandidate> {
        if video_audio.is_empty() || replacement.is_empty() {
            return Err(AnalysisError::InvalidAudio("Empty audio signal".to_string()));
        }

        // Correlation only makes sense at a shared rate
        let resampled;
        let replacement = if replacement.sample_rate != video_audio.sample_rate {
            resampled = replacement.resampled(video_audio.sample_rate);
            &resampled
        } else {
            replacement
        };

        if video_audio.mean_energy() < SILENCE_ENERGY || replacement.mean_energy() < SILENCE_ENERGY
        {
            return Ok(OffsetCandidate::degenerate(EstimationMethod::Waveform));
        }

        let scores = self.cross_correlation(&video_audio.samples, &replacement.samples);
        let (lag, peak) = match pick_peak(scores.into_iter()) {
            Some(best) => best,
            None => return Ok(OffsetCandidate::degenerate(EstimationMethod::Waveform)),
        };

        // Positive lag: the shared content sits later in the video's
        // timeline, so the video leads.
        let offset_secs = lag as f64 / video_audio.sample_rate as f64;

        Ok(OffsetCandidate::new(
            offset_secs,
            peak,
            EstimationMethod::Waveform,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_signal(samples: Vec<f64>, sample_rate: u32) -> AudioSignal {
        AudioSignal::new(samples, sample_rate)
    }

    fn sine_burst(len: usize) -> Vec<f64> {
        (0..len).map(|i| (i as f64 * 0.1).sin()).collect()
    }

    #[test]
    fn identical_signals_have_zero_offset_and_full_confidence() {
        let est = WaveformEstimator::new();
        let signal = make_signal(sine_burst(4000), 1000);

        let candidate = est.estimate(&signal, &signal).unwrap();

        assert_eq!(candidate.method, EstimationMethod::Waveform);
        assert!(
            candidate.offset_secs.abs() < 1e-9,
            "expected 0 offset, got {}",
            candidate.offset_secs
        );
        assert!(
            candidate.confidence > 0.99,
            "expected ~1.0 confidence, got {}",
            candidate.confidence
        );
    }

    #[test]
    fn detects_video_leading() {
        let est = WaveformEstimator::new();
        let base = sine_burst(2000);

        // Video contains the content 100 samples later than the replacement
        let mut video = vec![0.0; 100];
        video.extend(&base);
        let video = make_signal(video, 1000);
        let audio = make_signal(base, 1000);

        let candidate = est.estimate(&video, &audio).unwrap();

        assert!(
            (candidate.offset_secs - 0.1).abs() < 0.002,
            "expected +0.1s, got {}",
            candidate.offset_secs
        );
    }

    #[test]
    fn detects_audio_leading() {
        let est = WaveformEstimator::new();
        let base = sine_burst(2000);

        // Replacement audio has 150 samples of lead-in the video lacks
        let mut audio = vec![0.0; 150];
        audio.extend(&base);
        let video = make_signal(base, 1000);
        let audio = make_signal(audio, 1000);

        let candidate = est.estimate(&video, &audio).unwrap();

        assert!(
            (candidate.offset_secs + 0.15).abs() < 0.002,
            "expected -0.15s, got {}",
            candidate.offset_secs
        );
    }

    #[test]
    fn silence_yields_zero_confidence_not_a_crash() {
        let est = WaveformEstimator::new();
        let silent = make_signal(vec![0.0; 1000], 1000);
        let voiced = make_signal(sine_burst(1000), 1000);

        let candidate = est.estimate(&silent, &voiced).unwrap();
        assert_eq!(candidate.confidence, 0.0);
        assert_eq!(candidate.offset_secs, 0.0);

        let candidate = est.estimate(&voiced, &silent).unwrap();
        assert_eq!(candidate.confidence, 0.0);
    }

    #[test]
    fn unrelated_noise_has_low_confidence() {
        let est = WaveformEstimator::new();

        // Two decorrelated pseudo-random sequences
        let noise = |seed: u64, len: usize| -> Vec<f64> {
            let mut state = seed;
            (0..len)
                .map(|_| {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    ((state >> 33) as f64 / (1u64 << 30) as f64) - 1.0
                })
                .collect()
        };

        let a = make_signal(noise(1, 8000), 1000);
        let b = make_signal(noise(99, 8000), 1000);

        let candidate = est.estimate(&a, &b).unwrap();
        assert!(
            candidate.confidence < 0.3,
            "expected low confidence, got {}",
            candidate.confidence
        );
    }

    #[test]
    fn resamples_mismatched_rates() {
        let est = WaveformEstimator::new();
        let base = sine_burst(4000);

        let video = make_signal(base.clone(), 1000);
        // Same content expressed at double rate
        let doubled: Vec<f64> = (0..8000).map(|i| ((i as f64 / 2.0) * 0.1).sin()).collect();
        let audio = make_signal(doubled, 2000);

        let candidate = est.estimate(&video, &audio).unwrap();
        assert!(
            candidate.offset_secs.abs() < 0.01,
            "expected ~0 offset across rates, got {}",
            candidate.offset_secs
        );
    }

    #[test]
    fn rejects_empty_signals() {
        let est = WaveformEstimator::new();
        let empty = make_signal(vec![], 1000);
        let voiced = make_signal(sine_burst(100), 1000);

        assert!(est.estimate(&empty, &voiced).is_err());
        assert!(est.estimate(&voiced, &empty).is_err());
    }
}
