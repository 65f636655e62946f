//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every threshold and analysis parameter the pipeline uses lives here so
//! tests can vary them without process-wide side effects.

use serde::{Deserialize, Serialize};

use crate::analysis::ChromaConfig;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Signal extraction settings.
    #[serde(default)]
    pub analysis: AnalysisSettings,

    /// Chromagram estimator settings.
    #[serde(default)]
    pub chroma: ChromaSettings,

    /// Estimator selection settings.
    #[serde(default)]
    pub selection: SelectionSettings,

    /// Output encoding settings for the merge step.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Signal extraction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Sample rate used for analysis (not playback).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// How many seconds of each source to analyze.
    #[serde(default = "default_analyze_duration")]
    pub analyze_duration_secs: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            analyze_duration_secs: default_analyze_duration(),
        }
    }
}

fn default_sample_rate() -> u32 {
    crate::analysis::DEFAULT_ANALYSIS_SAMPLE_RATE
}

fn default_analyze_duration() -> f64 {
    crate::analysis::DEFAULT_ANALYZE_DURATION_SECS
}

/// Chromagram estimator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromaSettings {
    /// FFT size for each analysis window.
    #[serde(default = "default_n_fft")]
    pub n_fft: usize,

    /// Hop between consecutive windows, in samples.
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,

    /// Bins below this frequency are ignored.
    #[serde(default = "default_min_frequency")]
    pub min_frequency_hz: f64,

    /// Minimum overlapping frames for a lag to be scored.
    #[serde(default = "default_min_overlap")]
    pub min_overlap_frames: usize,
}

impl Default for ChromaSettings {
    fn default() -> Self {
        Self {
            n_fft: default_n_fft(),
            hop_length: default_hop_length(),
            min_frequency_hz: default_min_frequency(),
            min_overlap_frames: default_min_overlap(),
        }
    }
}

fn default_n_fft() -> usize {
    4096
}

fn default_hop_length() -> usize {
    512
}

fn default_min_frequency() -> f64 {
    55.0
}

fn default_min_overlap() -> usize {
    16
}

impl From<&ChromaSettings> for ChromaConfig {
    fn from(settings: &ChromaSettings) -> Self {
        Self {
            n_fft: settings.n_fft,
            hop_length: settings.hop_length,
            min_frequency_hz: settings.min_frequency_hz,
            min_overlap_frames: settings.min_overlap_frames,
        }
    }
}

/// Estimator selection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Winning confidence below this triggers a low-confidence warning.
    #[serde(default = "default_low_confidence")]
    pub low_confidence_threshold: f64,

    /// Offsets differing by more than this many seconds count as a
    /// method mismatch.
    #[serde(default = "default_agreement_tolerance")]
    pub agreement_tolerance_secs: f64,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            low_confidence_threshold: default_low_confidence(),
            agreement_tolerance_secs: default_agreement_tolerance(),
        }
    }
}

fn default_low_confidence() -> f64 {
    0.3
}

fn default_agreement_tolerance() -> f64 {
    0.25
}

/// Encoding parameters for the merge step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Constant frame rate for the output (VFR sources are converted).
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Video codec passed to ffmpeg.
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Encoder preset.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant rate factor for the video encoder.
    #[serde(default = "default_crf")]
    pub crf: u32,

    /// Audio codec for the output.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate for the output.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            video_codec: default_video_codec(),
            preset: default_preset(),
            crf: default_crf(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

fn default_frame_rate() -> u32 {
    30
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_preset() -> String {
    "fast".to_string()
}

fn default_crf() -> u32 {
    18
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_analysis_constants() {
        let settings = Settings::default();
        assert_eq!(settings.analysis.sample_rate, 22050);
        assert!((settings.analysis.analyze_duration_secs - 40.0).abs() < 1e-9);
        assert_eq!(settings.chroma.hop_length, 512);
        assert!((settings.selection.low_confidence_threshold - 0.3).abs() < 1e-9);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.output.frame_rate, 30);
        assert_eq!(settings.output.video_codec, "libx264");
    }

    #[test]
    fn partial_section_keeps_other_fields_default() {
        let settings: Settings = toml::from_str(
            r#"
            [selection]
            low_confidence_threshold = 0.5
            "#,
        )
        .unwrap();

        assert!((settings.selection.low_confidence_threshold - 0.5).abs() < 1e-9);
        assert!((settings.selection.agreement_tolerance_secs - 0.25).abs() < 1e-9);
        assert_eq!(settings.analysis.sample_rate, 22050);
    }

    #[test]
    fn settings_round_trip_through_toml() {
        let settings = Settings::default();
        let text = toml::to_string(&settings).unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back.chroma.n_fft, settings.chroma.n_fft);
        assert_eq!(back.output.audio_bitrate, settings.output.audio_bitrate);
    }

    #[test]
    fn chroma_config_maps_from_settings() {
        let settings = ChromaSettings {
            n_fft: 2048,
            ..ChromaSettings::default()
        };
        let config = ChromaConfig::from(&settings);
        assert_eq!(config.n_fft, 2048);
        assert_eq!(config.hop_length, settings.hop_length);
    }
}
