use academy_api::ApiClient;
use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// Positions this close to the end count as finished.
const COMPLETION_TOLERANCE_SECS: f64 = 0.5;

/// Watch progress sent when the viewer leaves a video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    /// Percent watched, `0..=100`.
    pub progress: f64,
    /// Furthest watched second, rounded.
    pub last_position: u64,
    pub completed: bool,
}

/// Progress as stored by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressRecord {
    pub id: u64,
    pub video_id: u64,
    #[serde(default)]
    pub enrollment_id: Option<u64>,
    pub progress: f64,
    #[serde(default)]
    pub progress_percent: Option<f64>,
    pub completed: bool,
    pub last_position: f64,
}

/// Build a report from the furthest watched position and the media length.
/// An unknown (zero, infinite or NaN) duration yields 0% and not completed.
#[must_use]
pub fn progress_report(max_watched: f64, duration: f64) -> ProgressReport {
    let position = if max_watched.is_finite() {
        max_watched.max(0.0)
    } else {
        0.0
    };
    let known = duration.is_finite() && duration > 0.0;
    let progress = if known {
        (position / duration * 100.0).min(100.0)
    } else {
        0.0
    };
    ProgressReport {
        progress,
        last_position: whole_seconds(position),
        completed: known && position >= duration - COMPLETION_TOLERANCE_SECS,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_seconds(position: f64) -> u64 {
    // finite and non-negative here; `as` saturates beyond u64::MAX
    position.round() as u64
}

/// Persist `report` for `video_id`.
///
/// # Errors
/// [`PlaybackError::InvalidVideoId`] for id 0, otherwise any request error.
pub async fn update_progress(
    client: &ApiClient,
    video_id: u64,
    report: &ProgressReport,
) -> Result<ProgressRecord, PlaybackError> {
    if video_id == 0 {
        return Err(PlaybackError::InvalidVideoId(video_id));
    }
    let record = client
        .post(&format!("/student/video/videos/{video_id}/progress/"))
        .json(report)
        .send_json()
        .await?;
    tracing::debug!(video_id, progress = report.progress, "progress saved");
    Ok(record)
}
