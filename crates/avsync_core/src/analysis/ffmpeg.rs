//! FFmpeg audio extraction.
//!
//! Extracts the audio track from a media file using FFmpeg, downmixes to
//! mono, resamples to the analysis sample rate, and outputs raw f64 samples.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::analysis::types::{AnalysisError, AnalysisResult, AudioSignal};

/// Default sample rate for analysis. A low rate is enough for correlation
/// and keeps the FFT sizes small; this is not a playback rate.
pub const DEFAULT_ANALYSIS_SAMPLE_RATE: u32 = 22050;

/// Default analysis window in seconds. Offsets between two takes of the
/// same performance show up well inside the first minute.
pub const DEFAULT_ANALYZE_DURATION_SECS: f64 = 40.0;

/// Extract audio from a media file for analysis.
///
/// The audio is:
/// - Converted to mono (channel downmix)
/// - Resampled to the analysis sample rate
/// - Limited to `max_duration_secs` when given
/// - Peak-normalized so amplitude differences between devices drop out
///
/// Fails if the file is missing, has no decodable audio track, or FFmpeg
/// exits nonzero. A single failure is fatal to the run; there is no retry.
pub fn extract_audio(
    input_path: &Path,
    sample_rate: u32,
    max_duration_secs: Option<f64>,
) -> AnalysisResult<AudioSignal> {
    if !input_path.exists() {
        return Err(AnalysisError::SourceNotFound(
            input_path.display().to_string(),
        ));
    }

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-i").arg(input_path);

    if let Some(limit) = max_duration_secs {
        cmd.arg("-t").arg(format!("{:.3}", limit));
    }

    cmd.arg("-vn") // No video
        .arg("-ac")
        .arg("1") // Mono
        .arg("-ar")
        .arg(sample_rate.to_string());

    // Output raw f64 samples to stdout
    cmd.arg("-f")
        .arg("f64le")
        .arg("-acodec")
        .arg("pcm_f64le")
        .arg("pipe:1");

    cmd.stderr(Stdio::null()).stdout(Stdio::piped());

    tracing::debug!("Running FFmpeg: {:?}", cmd);

    let mut child = cmd
        .spawn()
        .map_err(|e| AnalysisError::FfmpegError(format!("Failed to spawn FFmpeg: {}", e)))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| AnalysisError::FfmpegError("Failed to capture FFmpeg stdout".to_string()))?;

    let mut buffer = Vec::new();
    stdout
        .read_to_end(&mut buffer)
        .map_err(|e| AnalysisError::FfmpegError(format!("Failed to read FFmpeg output: {}", e)))?;

    let status = child
        .wait()
        .map_err(|e| AnalysisError::FfmpegError(format!("FFmpeg process error: {}", e)))?;

    if !status.success() {
        return Err(AnalysisError::FfmpegError(format!(
            "FFmpeg exited with code: {:?}",
            status.code()
        )));
    }

    let mut samples = bytes_to_f64_samples(&buffer);

    if samples.is_empty() {
        return Err(AnalysisError::ExtractionError(
            "No audio samples extracted".to_string(),
        ));
    }

    peak_normalize(&mut samples);

    tracing::debug!(
        "Extracted {} samples ({:.2}s) from {}",
        samples.len(),
        samples.len() as f64 / sample_rate as f64,
        input_path.display()
    );

    Ok(AudioSignal::new(samples, sample_rate))
}

/// Get the duration of a media file in seconds using FFprobe.
pub fn get_duration(input_path: &Path) -> AnalysisResult<f64> {
    if !input_path.exists() {
        return Err(AnalysisError::SourceNotFound(
            input_path.display().to_string(),
        ));
    }

    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(input_path)
        .output()
        .map_err(|e| AnalysisError::FfmpegError(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(AnalysisError::FfmpegError(
            "ffprobe failed to get duration".to_string(),
        ));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    duration_str
        .trim()
        .parse::<f64>()
        .map_err(|e| AnalysisError::FfmpegError(format!("Failed to parse duration: {}", e)))
}

/// Check whether FFmpeg is available on PATH.
pub fn check_ffmpeg() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Convert raw bytes to f64 samples (little-endian).
fn bytes_to_f64_samples(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let arr: [u8; 8] = chunk.try_into().unwrap();
            f64::from_le_bytes(arr)
        })
        .collect()
}

/// Scale samples so the peak magnitude is 1.0. Silence is left untouched.
fn peak_normalize(samples: &mut [f64]) {
    let peak = samples.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
    if peak > 1e-12 {
        let scale = 1.0 / peak;
        for s in samples.iter_mut() {
            *s *= scale;
        }
    }
}
