use serde::{Deserialize, Serialize};

/// How a video is being watched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMode {
    /// Assigned class viewing; monitored by default.
    ProctoredClass,
    /// Re-watching after the fact; violations are not reported.
    FreeReview,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekMode {
    Blocked,
    /// Forward seeks allowed up to the furthest watched point plus a grace.
    BoundedForward,
    /// Unrecognised modes fall back here.
    #[default]
    #[serde(other)]
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeekPolicy {
    pub mode: SeekMode,
    pub grace_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatePolicy {
    pub max: f64,
    pub ui_control: bool,
}

/// Playback policy with every backend default filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPolicy")]
pub struct PlaybackPolicy {
    pub access_mode: AccessMode,
    pub monitoring_enabled: bool,
    pub allow_seek: bool,
    pub seek: SeekPolicy,
    pub playback_rate: RatePolicy,
    pub watermark_enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawPolicy {
    #[serde(default)]
    access_mode: Option<AccessMode>,
    #[serde(default)]
    monitoring_enabled: Option<bool>,
    #[serde(default)]
    allow_seek: Option<bool>,
    #[serde(default)]
    seek: Option<RawSeek>,
    #[serde(default)]
    playback_rate: Option<RawRate>,
    #[serde(default)]
    watermark: Option<RawWatermark>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSeek {
    #[serde(default)]
    mode: Option<SeekMode>,
    #[serde(default)]
    grace_seconds: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRate {
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    ui_control: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWatermark {
    #[serde(default)]
    enabled: Option<bool>,
}

const DEFAULT_GRACE_SECONDS: f64 = 3.0;
const DEFAULT_MAX_RATE: f64 = 16.0;
pub(crate) const MIN_RATE: f64 = 0.25;

impl From<RawPolicy> for PlaybackPolicy {
    fn from(raw: RawPolicy) -> Self {
        let access_mode = raw.access_mode.unwrap_or_default();
        let seek = raw.seek.unwrap_or_default();
        let rate = raw.playback_rate.unwrap_or_default();
        Self {
            access_mode,
            monitoring_enabled: raw
                .monitoring_enabled
                .unwrap_or(access_mode == AccessMode::ProctoredClass),
            allow_seek: raw.allow_seek.unwrap_or(true),
            seek: SeekPolicy {
                mode: seek.mode.unwrap_or_default(),
                grace_seconds: seek.grace_seconds.unwrap_or(DEFAULT_GRACE_SECONDS),
            },
            playback_rate: RatePolicy {
                max: rate.max.unwrap_or(DEFAULT_MAX_RATE),
                ui_control: rate.ui_control.unwrap_or(true),
            },
            watermark_enabled: raw.watermark.and_then(|w| w.enabled).unwrap_or(false),
        }
    }
}

impl Default for PlaybackPolicy {
    fn default() -> Self {
        RawPolicy::default().into()
    }
}

impl PlaybackPolicy {
    /// Seeking is allowed at all (bounded seeks included).
    #[must_use]
    pub fn seek_allowed(&self) -> bool {
        self.allow_seek && self.seek.mode != SeekMode::Blocked
    }

    #[must_use]
    pub fn grace_seconds(&self) -> f64 {
        if self.seek.grace_seconds.is_finite() {
            self.seek.grace_seconds.max(0.0)
        } else {
            0.0
        }
    }

    /// Highest permitted rate, never below 1x. Zero or garbage reads as 1x.
    #[must_use]
    pub fn max_rate(&self) -> f64 {
        let max = self.playback_rate.max;
        if max.is_finite() && max > 0.0 {
            max.max(1.0)
        } else {
            1.0
        }
    }

    #[must_use]
    pub fn speed_locked(&self) -> bool {
        !self.playback_rate.ui_control || self.max_rate() <= 1.0001
    }

    /// Seek and speed violations are only reported outside free review.
    #[must_use]
    pub fn reports_violations(&self) -> bool {
        self.access_mode != AccessMode::FreeReview
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn parse(json: &str) -> PlaybackPolicy {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_policy_gets_defaults() {
        let policy = parse("{}");
        assert_eq!(policy.access_mode, AccessMode::Other);
        assert!(!policy.monitoring_enabled);
        assert!(policy.allow_seek);
        assert_eq!(policy.seek.mode, SeekMode::Free);
        assert!((policy.grace_seconds() - 3.0).abs() < f64::EPSILON);
        assert!((policy.max_rate() - 16.0).abs() < f64::EPSILON);
        assert!(policy.playback_rate.ui_control);
        assert!(!policy.watermark_enabled);
        assert_eq!(policy, PlaybackPolicy::default());
    }

    #[test]
    fn proctored_class_monitors_unless_told_otherwise() {
        assert!(parse(r#"{"access_mode":"PROCTORED_CLASS"}"#).monitoring_enabled);
        assert!(
            !parse(r#"{"access_mode":"PROCTORED_CLASS","monitoring_enabled":false}"#)
                .monitoring_enabled
        );
        assert!(parse(r#"{"access_mode":"FREE_REVIEW","monitoring_enabled":true}"#).monitoring_enabled);
    }

    #[test]
    fn nulls_and_unknown_values_fall_back() {
        let policy = parse(
            r#"{"access_mode":"SOMETHING_NEW","seek":{"mode":"rewind_only","grace_seconds":null},"playback_rate":null}"#,
        );
        assert_eq!(policy.access_mode, AccessMode::Other);
        assert_eq!(policy.seek.mode, SeekMode::Free);
        assert!((policy.grace_seconds() - 3.0).abs() < f64::EPSILON);
        assert!((policy.max_rate() - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn seek_mode_names() {
        for (raw, mode) in [
            ("\"free\"", SeekMode::Free),
            ("\"blocked\"", SeekMode::Blocked),
            ("\"bounded_forward\"", SeekMode::BoundedForward),
            ("\"rewind_only\"", SeekMode::Free),
        ] {
            assert_eq!(serde_json::from_str::<SeekMode>(raw).unwrap(), mode, "{raw}");
        }
        assert_eq!(SeekMode::default(), SeekMode::Free);
        assert_eq!(serde_json::to_string(&SeekMode::Free).unwrap(), "\"free\"");
    }

    #[test]
    fn blocked_mode_disables_seeking() {
        assert!(!parse(r#"{"seek":{"mode":"blocked"}}"#).seek_allowed());
        assert!(!parse(r#"{"allow_seek":false}"#).seek_allowed());
        assert!(parse(r#"{"seek":{"mode":"bounded_forward"}}"#).seek_allowed());
    }

    #[test]
    fn speed_lock_rules() {
        assert!(parse(r#"{"playback_rate":{"ui_control":false}}"#).speed_locked());
        assert!(parse(r#"{"playback_rate":{"max":1}}"#).speed_locked());
        assert!(parse(r#"{"playback_rate":{"max":0}}"#).speed_locked());
        assert!(parse(r#"{"playback_rate":{"max":0.5}}"#).speed_locked());
        assert!(!parse(r#"{"playback_rate":{"max":2}}"#).speed_locked());
    }

    #[test]
    fn negative_grace_is_zero() {
        let policy = parse(r#"{"seek":{"mode":"bounded_forward","grace_seconds":-5}}"#);
        assert!(policy.grace_seconds().abs() < f64::EPSILON);
    }
}
