//! Merge execution via FFmpeg.
//!
//! Consumes an `EditPlan` and produces the synced output file. Two
//! strategies, matching the plan's two branches:
//!
//! - Video trimmed (offset >= 0): two steps. First merge with `-itsoffset`
//!   while converting VFR to CFR (re-encode, prevents sync drift), then trim
//!   the intermediate with stream copy.
//! - Audio trimmed (offset < 0): single pass seeking into the audio input
//!   with CFR conversion.
//!
//! Command construction is pure and unit-testable; only `run_merge` touches
//! the process table. Merge failures are fatal, no retry.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use crate::config::OutputSettings;
use crate::plan::EditPlan;

/// Error types for the merge step.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// An ffmpeg invocation exited nonzero.
    #[error("FFmpeg {step} step failed: {stderr}")]
    FfmpegFailed { step: &'static str, stderr: String },

    /// Could not spawn ffmpeg or manage the scratch file.
    #[error("IO error during merge: {0}")]
    Io(#[from] std::io::Error),
}

/// Arguments for the sync step: merge video with delayed audio, CFR output.
fn sync_step_args(
    video: &Path,
    audio: &Path,
    intermediate: &Path,
    plan: &EditPlan,
    output: &OutputSettings,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    args.push("-y".into());
    args.push("-i".into());
    args.push(video.into());
    // Delay the audio input so it lines up with the video's timeline
    args.push("-itsoffset".into());
    args.push(format!("{:.3}", plan.video_trim_start).into());
    args.push("-i".into());
    args.push(audio.into());
    args.push("-map".into());
    args.push("0:v:0".into());
    args.push("-map".into());
    args.push("1:a:0".into());
    args.push("-fps_mode".into());
    args.push("cfr".into());
    args.push("-r".into());
    args.push(output.frame_rate.to_string().into());
    args.push("-c:v".into());
    args.push(output.video_codec.as_str().into());
    args.push("-preset".into());
    args.push(output.preset.as_str().into());
    args.push("-crf".into());
    args.push(output.crf.to_string().into());
    args.push("-c:a".into());
    args.push(output.audio_codec.as_str().into());
    args.push("-b:a".into());
    args.push(output.audio_bitrate.as_str().into());
    args.push(intermediate.into());
    args
}

/// Arguments for the trim step: cut the synced intermediate down to the
/// replacement audio's duration with stream copy (the intermediate is
/// already CFR, so copy is safe).
fn trim_step_args(intermediate: &Path, destination: &Path, plan: &EditPlan) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    args.push("-y".into());
    args.push("-ss".into());
    args.push(format!("{:.3}", plan.video_trim_start).into());
    args.push("-i".into());
    args.push(intermediate.into());
    args.push("-t".into());
    args.push(format!("{:.3}", plan.output_duration).into());
    args.push("-c".into());
    args.push("copy".into());
    args.push("-movflags".into());
    args.push("+faststart".into());
    args.push(destination.into());
    args
}

/// Arguments for the single-pass merge where the audio has lead-in to skip.
fn audio_trim_args(
    video: &Path,
    audio: &Path,
    destination: &Path,
    plan: &EditPlan,
    output: &OutputSettings,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    args.push("-y".into());
    args.push("-i".into());
    args.push(video.into());
    // Seek applies to the following audio input
    args.push("-ss".into());
    args.push(format!("{:.3}", plan.audio_trim_start).into());
    args.push("-i".into());
    args.push(audio.into());
    args.push("-map".into());
    args.push("0:v:0".into());
    args.push("-map".into());
    args.push("1:a:0".into());
    args.push("-fps_mode".into());
    args.push("cfr".into());
    args.push("-r".into());
    args.push(output.frame_rate.to_string().into());
    args.push("-c:v".into());
    args.push(output.video_codec.as_str().into());
    args.push("-preset".into());
    args.push(output.preset.as_str().into());
    args.push("-crf".into());
    args.push(output.crf.to_string().into());
    args.push("-c:a".into());
    args.push(output.audio_codec.as_str().into());
    args.push("-b:a".into());
    args.push(output.audio_bitrate.as_str().into());
    args.push("-t".into());
    args.push(format!("{:.3}", plan.output_duration).into());
    args.push("-movflags".into());
    args.push("+faststart".into());
    args.push(destination.into());
    args
}

/// Run one ffmpeg invocation, mapping a nonzero exit to `FfmpegFailed`.
fn run_ffmpeg(args: &[OsString], step: &'static str) -> Result<(), MergeError> {
    tracing::debug!("Running FFmpeg ({}): {:?}", step, args);

    let output = Command::new("ffmpeg").args(args).output()?;
    if !output.status.success() {
        return Err(MergeError::FfmpegFailed {
            step,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

/// Execute the plan: merge the video with the replacement audio into
/// `destination`. Nothing is written to `destination` unless every ffmpeg
/// step succeeds; the intermediate scratch file is removed either way.
pub fn run_merge(
    video: &Path,
    audio: &Path,
    destination: &Path,
    plan: &EditPlan,
    output: &OutputSettings,
) -> Result<(), MergeError> {
    if plan.audio_trim_start == 0.0 {
        tracing::info!(
            "Syncing audio (delay {:.3}s) and converting VFR to CFR",
            plan.video_trim_start
        );

        // Scratch file removed on drop, success or failure
        let intermediate = tempfile::Builder::new()
            .prefix("avsync")
            .suffix(".mp4")
            .tempfile()?;

        run_ffmpeg(
            &sync_step_args(video, audio, intermediate.path(), plan, output),
            "sync",
        )?;

        tracing::info!("Trimming to audio duration ({:.3}s)", plan.output_duration);
        run_ffmpeg(&trim_step_args(intermediate.path(), destination, plan), "trim")?;
    } else {
        tracing::info!(
            "Trimming audio: skipping first {:.3}s, duration {:.3}s",
            plan.audio_trim_start,
            plan.output_duration
        );
        run_ffmpeg(
            &audio_trim_args(video, audio, destination, plan, output),
            "merge",
        )?;
    }

    tracing::info!("Created: {}", destination.display());
    Ok(())
}
