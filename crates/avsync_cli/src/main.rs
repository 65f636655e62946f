//! avsync - sync a video with separately recorded audio.
//!
//! Detects the time offset between the video's embedded audio and the
//! replacement track using cross-correlation, then merges them with the
//! output trimmed to the replacement audio's length.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use avsync_core::analysis::check_ffmpeg;
use avsync_core::config::{self, Settings};
use avsync_core::logging::init_tracing;

#[derive(Parser)]
#[command(
    name = "avsync",
    version,
    about = "Auto-sync video with separately recorded audio using cross-correlation"
)]
struct Cli {
    /// Video file (its audio will be replaced)
    video: PathBuf,

    /// Audio file to sync and merge
    audio: PathBuf,

    /// Output file (default: <video stem>_synced.mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to a TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Estimate the offset and print the edit plan without merging
    #[arg(long)]
    dry_run: bool,

    /// Print the decision and plan as JSON
    #[arg(long)]
    json: bool,
}

fn default_output(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    video.with_file_name(format!("{}_synced.mp4", stem))
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    match &cli.config {
        Some(path) => config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => config::load_or_default(Path::new("avsync.toml"))
            .context("Failed to load avsync.toml"),
    }
}

fn main() -> Result<()> {
    init_tracing("info");

    let cli = Cli::parse();

    if !cli.video.exists() {
        bail!("Video not found: {}", cli.video.display());
    }
    if !cli.audio.exists() {
        bail!("Audio not found: {}", cli.audio.display());
    }
    if !check_ffmpeg() {
        bail!("FFmpeg not found. Install it and make sure it is on PATH.");
    }

    let settings = load_settings(&cli)?;
    let output = cli.output.clone().unwrap_or_else(|| default_output(&cli.video));

    tracing::info!("Video: {}", cli.video.display());
    tracing::info!("Audio: {}", cli.audio.display());

    if cli.dry_run {
        let (decision, plan) = avsync_core::analyze(&cli.video, &cli.audio, &settings)?;

        if cli.json {
            let report = serde_json::json!({
                "decision": decision,
                "plan": plan,
                "output": output,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!(
                "offset {:+.3}s ({}, confidence {:.2}); trim video {:.3}s, trim audio {:.3}s, output {:.3}s",
                decision.offset_secs,
                decision.method,
                decision.confidence,
                plan.video_trim_start,
                plan.audio_trim_start,
                plan.output_duration
            );
        }
        return Ok(());
    }

    let outcome = avsync_core::run(&cli.video, &cli.audio, &output, &settings)?;

    if cli.json {
        let report = serde_json::json!({
            "decision": outcome.decision,
            "plan": outcome.plan,
            "output": outcome.output_path,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_is_beside_the_video() {
        let out = default_output(Path::new("/clips/take1.mov"));
        assert_eq!(out, PathBuf::from("/clips/take1_synced.mp4"));
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from([
            "avsync", "v.mp4", "a.wav", "-o", "out.mp4", "--dry-run", "--json",
        ]);
        assert_eq!(cli.output, Some(PathBuf::from("out.mp4")));
        assert!(cli.dry_run);
        assert!(cli.json);
    }
}
