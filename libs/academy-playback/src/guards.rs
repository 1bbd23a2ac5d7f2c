use std::time::{Duration, Instant};

use serde_json::{Value, json};

use crate::policy::{MIN_RATE, PlaybackPolicy, SeekMode};

/// Minimum gap between two seek warnings shown to the viewer.
pub const SEEK_WARNING_INTERVAL: Duration = Duration::from_millis(900);

const EPSILON: f64 = 0.001;
const RATE_EPSILON: f64 = 0.0001;

/// Outcome of a seek request.
#[derive(Debug, Clone, PartialEq)]
pub enum SeekDecision {
    Allow,
    /// Jump back to `position`. `warn` is false while the warning is
    /// throttled. `attempt` is the `SEEK_ATTEMPT` payload.
    Clamp {
        position: f64,
        warn: bool,
        attempt: Value,
    },
}

/// Tracks the furthest watched position and polices seeks against it.
#[derive(Debug)]
pub struct SeekGuard {
    mode: SeekMode,
    allowed: bool,
    grace: f64,
    max_watched: f64,
    last_warning: Option<Instant>,
}

impl SeekGuard {
    #[must_use]
    pub fn new(policy: &PlaybackPolicy) -> Self {
        Self {
            mode: policy.seek.mode,
            allowed: policy.seek_allowed(),
            grace: policy.grace_seconds(),
            max_watched: 0.0,
            last_warning: None,
        }
    }

    /// Record normal playback reaching `position`.
    pub fn observe(&mut self, position: f64) {
        if position.is_finite() && position > self.max_watched {
            self.max_watched = position;
        }
    }

    #[must_use]
    pub fn max_watched(&self) -> f64 {
        self.max_watched
    }

    /// Decide on a seek to `target` made at `now`.
    pub fn check(&mut self, target: f64, now: Instant) -> SeekDecision {
        let bounded = self.mode == SeekMode::BoundedForward;
        if self.allowed && !bounded {
            return SeekDecision::Allow;
        }

        let max_watched = self.max_watched;
        if !self.allowed {
            return SeekDecision::Clamp {
                position: max_watched,
                warn: self.should_warn(now),
                attempt: json!({
                    "mode": "blocked",
                    "target": target,
                    "max_watched": max_watched,
                }),
            };
        }

        let allowed_max = max_watched + self.grace;
        if target > allowed_max + EPSILON {
            return SeekDecision::Clamp {
                position: allowed_max,
                warn: self.should_warn(now),
                attempt: json!({
                    "mode": "bounded_forward",
                    "target": target,
                    "max_watched": max_watched,
                    "grace": self.grace,
                }),
            };
        }
        SeekDecision::Allow
    }

    fn should_warn(&mut self, now: Instant) -> bool {
        let due = self
            .last_warning
            .is_none_or(|last| now.saturating_duration_since(last) > SEEK_WARNING_INTERVAL);
        if due {
            self.last_warning = Some(now);
        }
        due
    }
}

/// Rate actually applied and the `SPEED_CHANGE_ATTEMPT` payload when the
/// request broke the policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RateDecision {
    pub rate: f64,
    pub violation: Option<Value>,
}

/// Enforces the playback rate limits.
#[derive(Debug, Clone, Copy)]
pub struct RateGuard {
    max: f64,
    locked: bool,
}

impl RateGuard {
    #[must_use]
    pub fn new(policy: &PlaybackPolicy) -> Self {
        Self {
            max: policy.max_rate(),
            locked: policy.speed_locked(),
        }
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn apply(&self, requested: f64) -> RateDecision {
        if self.locked {
            let violation = ((requested - 1.0).abs() > EPSILON)
                .then(|| json!({ "attempted": requested, "enforced": 1.0 }));
            return RateDecision {
                rate: 1.0,
                violation,
            };
        }
        if !requested.is_finite() {
            return RateDecision {
                rate: 1.0,
                violation: None,
            };
        }
        let rate = requested.clamp(MIN_RATE, self.max);
        let violation = (requested > self.max + RATE_EPSILON)
            .then(|| json!({ "attempted": requested, "enforced": self.max }));
        RateDecision { rate, violation }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn policy(json: &str) -> PlaybackPolicy {
        serde_json::from_str(json).unwrap()
    }

    fn clamped_to(decision: &SeekDecision) -> f64 {
        match decision {
            SeekDecision::Clamp { position, .. } => *position,
            SeekDecision::Allow => panic!("expected clamp"),
        }
    }

    #[test]
    fn free_mode_allows_everything() {
        let mut guard = SeekGuard::new(&PlaybackPolicy::default());
        assert_eq!(guard.check(500.0, Instant::now()), SeekDecision::Allow);
    }

    #[test]
    fn blocked_mode_returns_to_max_watched() {
        let mut guard = SeekGuard::new(&policy(r#"{"seek":{"mode":"blocked"}}"#));
        guard.observe(42.0);
        guard.observe(10.0);
        let decision = guard.check(5.0, Instant::now());
        assert!((clamped_to(&decision) - 42.0).abs() < f64::EPSILON);
        if let SeekDecision::Clamp { attempt, .. } = decision {
            assert_eq!(attempt["mode"], "blocked");
        }
    }

    #[test]
    fn bounded_forward_allows_grace_and_backwards() {
        let mut guard = SeekGuard::new(&policy(
            r#"{"seek":{"mode":"bounded_forward","grace_seconds":3}}"#,
        ));
        guard.observe(100.0);
        let now = Instant::now();
        assert_eq!(guard.check(20.0, now), SeekDecision::Allow);
        assert_eq!(guard.check(103.0, now), SeekDecision::Allow);
        let decision = guard.check(150.0, now);
        assert!((clamped_to(&decision) - 103.0).abs() < f64::EPSILON);
    }

    #[test]
    fn warnings_are_throttled() {
        let mut guard = SeekGuard::new(&policy(r#"{"allow_seek":false}"#));
        let start = Instant::now();
        let warned = |d: SeekDecision| matches!(d, SeekDecision::Clamp { warn: true, .. });
        assert!(warned(guard.check(10.0, start)));
        assert!(!warned(guard.check(10.0, start + Duration::from_millis(500))));
        assert!(warned(guard.check(10.0, start + Duration::from_millis(1000))));
    }

    #[test]
    fn locked_rate_is_forced_to_one() {
        let guard = RateGuard::new(&policy(r#"{"playback_rate":{"ui_control":false}}"#));
        assert!(guard.is_locked());
        let decision = guard.apply(2.0);
        assert!((decision.rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(decision.violation.unwrap()["enforced"], 1.0);
        assert!(guard.apply(1.0).violation.is_none());
    }

    #[test]
    fn rate_is_clamped_to_range() {
        let guard = RateGuard::new(&policy(r#"{"playback_rate":{"max":2}}"#));
        let fast = guard.apply(4.0);
        assert!((fast.rate - 2.0).abs() < f64::EPSILON);
        assert!(fast.violation.is_some());

        let slow = guard.apply(0.1);
        assert!((slow.rate - 0.25).abs() < f64::EPSILON);
        assert!(slow.violation.is_none());

        assert!((guard.apply(1.5).rate - 1.5).abs() < f64::EPSILON);
    }
}
