//! The sync pipeline.
//!
//! Strictly sequential, single run: extract both signals, estimate and
//! select the offset, probe the real stream durations, build the edit plan,
//! and hand it to the merge step. Any failure before the merge leaves no
//! output file behind.

use std::path::{Path, PathBuf};

use crate::analysis::{
    default_estimators, estimate_offset, extract_audio, get_duration, AnalysisError, ChromaConfig,
    SelectionConfig, SyncDecision,
};
use crate::config::Settings;
use crate::merge::{run_merge, MergeError};
use crate::plan::{build_edit_plan, EditPlan, PlanError};

/// Error from any pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Extraction or estimation failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// The computed offset admits no valid alignment.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// The final merge failed.
    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Everything a completed (or dry) run produced.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// The selector's decision, warnings included.
    pub decision: SyncDecision,
    /// The edit plan derived from the decision.
    pub plan: EditPlan,
    /// Where the merged file was (or would be) written.
    pub output_path: PathBuf,
}

/// Estimate the offset and build the edit plan without touching the output.
///
/// This is the whole pipeline minus the merge; `--dry-run` stops here.
pub fn analyze(
    video: &Path,
    audio: &Path,
    settings: &Settings,
) -> Result<(SyncDecision, EditPlan), SyncError> {
    let sample_rate = settings.analysis.sample_rate;
    let window = Some(settings.analysis.analyze_duration_secs);

    tracing::info!("Loading audio from video...");
    let video_audio = extract_audio(video, sample_rate, window)?;

    tracing::info!("Loading replacement audio...");
    let replacement = extract_audio(audio, sample_rate, window)?;

    tracing::info!("Analyzing {:.1}s of audio", video_audio.duration_secs());

    let estimators = default_estimators(&ChromaConfig::from(&settings.chroma));
    let selection = SelectionConfig::from(&settings.selection);
    let decision = estimate_offset(&video_audio, &replacement, &estimators, &selection);

    tracing::info!(
        "Detected offset: {:+.3}s ({}, confidence {:.2})",
        decision.offset_secs,
        decision.method,
        decision.confidence
    );
    if let Some(warning) = decision.warning {
        tracing::warn!("{}", warning);
    }

    // The trims apply to the full streams, so probe their real durations
    // rather than reusing the bounded analysis windows.
    let video_duration = get_duration(video)?;
    let audio_duration = get_duration(audio)?;

    let plan = build_edit_plan(decision.offset_secs, video_duration, audio_duration)?;

    tracing::debug!(
        "Plan: trim video {:.3}s, trim audio {:.3}s, output {:.3}s",
        plan.video_trim_start,
        plan.audio_trim_start,
        plan.output_duration
    );

    Ok((decision, plan))
}

/// Run the full pipeline: analyze, then merge into `output_path`.
pub fn run(
    video: &Path,
    audio: &Path,
    output_path: &Path,
    settings: &Settings,
) -> Result<SyncOutcome, SyncError> {
    let (decision, plan) = analyze(video, audio, settings)?;

    run_merge(video, audio, output_path, &plan, &settings.output)?;

    Ok(SyncOutcome {
        decision,
        plan,
        output_path: output_path.to_path_buf(),
    })
}
