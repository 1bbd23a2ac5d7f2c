use academy_api::ApiClient;
use serde::Deserialize;

use crate::error::PlaybackError;
use crate::policy::{AccessMode, PlaybackPolicy};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoSummary {
    pub id: u64,
    #[serde(default)]
    pub session_id: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub access_mode: Option<AccessMode>,
}

/// What the backend hands out before playback starts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaybackInfo {
    pub video: VideoSummary,
    #[serde(default)]
    pub play_url: Option<String>,
    #[serde(default)]
    pub hls_url: Option<String>,
    #[serde(default)]
    pub mp4_url: Option<String>,
    #[serde(default)]
    policy: Option<PlaybackPolicy>,
}

impl PlaybackInfo {
    /// Normalised policy; a missing policy means all defaults.
    #[must_use]
    pub fn policy(&self) -> PlaybackPolicy {
        self.policy.clone().unwrap_or_default()
    }

    /// Preferred stream: the backend play URL, then HLS, then MP4.
    #[must_use]
    pub fn stream_url(&self) -> Option<&str> {
        [&self.play_url, &self.hls_url, &self.mp4_url]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

/// Load playback details for `video_id`, scoped to an enrollment when given.
///
/// # Errors
/// [`PlaybackError::InvalidVideoId`] for id 0, otherwise any request error.
pub async fn fetch_playback(
    client: &ApiClient,
    video_id: u64,
    enrollment_id: Option<u64>,
) -> Result<PlaybackInfo, PlaybackError> {
    if video_id == 0 {
        return Err(PlaybackError::InvalidVideoId(video_id));
    }
    let mut request = client.get(&format!("/student/video/videos/{video_id}/playback/"));
    if let Some(enrollment) = enrollment_id {
        request = request.query("enrollment", &enrollment.to_string());
    }
    Ok(request.send_json().await?)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::policy::SeekMode;

    #[test]
    fn parses_payload_with_null_policy() {
        let info: PlaybackInfo = serde_json::from_str(
            r#"{"video":{"id":3,"title":"Lesson 1"},"play_url":" ","hls_url":"https://cdn/x.m3u8","policy":null}"#,
        )
        .unwrap();
        assert_eq!(info.video.id, 3);
        assert_eq!(info.stream_url(), Some("https://cdn/x.m3u8"));
        assert_eq!(info.policy(), PlaybackPolicy::default());
    }

    #[test]
    fn policy_is_normalised() {
        let info: PlaybackInfo = serde_json::from_str(
            r#"{"video":{"id":3},"policy":{"access_mode":"PROCTORED_CLASS","seek":{"mode":"bounded_forward"}}}"#,
        )
        .unwrap();
        let policy = info.policy();
        assert!(policy.monitoring_enabled);
        assert_eq!(policy.seek.mode, SeekMode::BoundedForward);
        assert!(info.stream_url().is_none());
    }
}
