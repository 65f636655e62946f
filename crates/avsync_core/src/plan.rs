//! Edit planning.
//!
//! Translates the chosen offset into concrete trim parameters for the merge
//! step. The guiding invariant of the whole tool: the output duration is
//! bound to the replacement audio's effective length, never to the video.

use serde::Serialize;

/// Error types for edit planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The required trim meets or exceeds the trimmed stream's length;
    /// there is no valid alignment.
    #[error(
        "Computed offset {offset_secs:+.3}s exceeds the {stream} duration of {stream_duration:.3}s - no valid alignment"
    )]
    InvalidOffset {
        offset_secs: f64,
        stream: &'static str,
        stream_duration: f64,
    },
}

/// Concrete edit parameters handed to the merge step.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EditPlan {
    /// Seconds to trim from the start of the video.
    pub video_trim_start: f64,
    /// Seconds to trim from the start of the replacement audio.
    pub audio_trim_start: f64,
    /// Final output duration in seconds; always the replacement audio's
    /// duration minus its own trim.
    pub output_duration: f64,
}

/// Build an edit plan from the chosen offset and the two stream durations.
///
/// Sign convention: a positive offset means the video leads, so the video is
/// trimmed; a negative offset means the replacement audio leads, so the
/// audio is trimmed and the output shortens accordingly.
pub fn build_edit_plan(
    offset_secs: f64,
    video_duration: f64,
    audio_duration: f64,
) -> Result<EditPlan, PlanError> {
    if offset_secs >= 0.0 {
        if offset_secs >= video_duration {
            return Err(PlanError::InvalidOffset {
                offset_secs,
                stream: "video",
                stream_duration: video_duration,
            });
        }
        Ok(EditPlan {
            video_trim_start: offset_secs,
            audio_trim_start: 0.0,
            output_duration: audio_duration,
        })
    } else {
        let trim = -offset_secs;
        if trim >= audio_duration {
            return Err(PlanError::InvalidOffset {
                offset_secs,
                stream: "audio",
                stream_duration: audio_duration,
            });
        }
        Ok(EditPlan {
            video_trim_start: 0.0,
            audio_trim_start: trim,
            output_duration: audio_duration - trim,
        })
    }
}
