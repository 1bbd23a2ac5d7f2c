//! Monitored playback session: periodic heartbeats, batched event upload and
//! the seek/rate guards for one video.

use std::sync::Arc;
use std::time::{Duration, Instant};

use academy_api::{ApiClient, ApiError};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::events::{EventQueue, EventType, PlaybackEvent};
use crate::guards::{RateGuard, SeekDecision, SeekGuard};
use crate::policy::PlaybackPolicy;
use crate::progress::{ProgressReport, progress_report};

pub const HEARTBEAT_PATH: &str = "/videos/playback/heartbeat/";
pub const REFRESH_PATH: &str = "/videos/playback/refresh/";
pub const END_PATH: &str = "/videos/playback/end/";
pub const EVENTS_PATH: &str = "/videos/playback/events/";

/// Tokens with this prefix are issued locally and never reach the backend.
pub const LOCAL_TOKEN_PREFIX: &str = "student-";

/// Timer periods for a monitored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTimers {
    pub heartbeat: Duration,
    pub flush: Duration,
}

impl Default for PlaybackTimers {
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_secs(30),
            flush: Duration::from_millis(2200),
        }
    }
}

/// Why the backend ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    PolicyChanged,
    SessionInactive,
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::PolicyChanged => "policy_changed",
            Self::SessionInactive => "session_inactive",
        })
    }
}

impl SessionEnd {
    /// Map a failed playback call to a terminal reason, if it is one.
    #[must_use]
    pub fn from_error(err: &ApiError) -> Option<Self> {
        let detail = err.detail().unwrap_or_default();
        if detail.contains("policy_changed") {
            Some(Self::PolicyChanged)
        } else if detail.contains("session_inactive")
            || err.status().is_some_and(|s| s.as_u16() == 409)
        {
            Some(Self::SessionInactive)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackOptions {
    pub video_id: u64,
    pub enrollment_id: Option<u64>,
    pub token: String,
    pub policy: PlaybackPolicy,
}

#[derive(Serialize)]
struct EventBatch<'a> {
    token: &'a str,
    video_id: u64,
    enrollment_id: Option<u64>,
    events: &'a [PlaybackEvent],
}

struct Inner {
    client: ApiClient,
    video_id: u64,
    enrollment_id: Option<u64>,
    policy: PlaybackPolicy,
    token: RwLock<String>,
    queue: Mutex<EventQueue>,
    seek: Mutex<SeekGuard>,
    rate: RateGuard,
    cancel: CancellationToken,
    ended: watch::Sender<Option<SessionEnd>>,
}

/// One video being watched.
///
/// With monitoring enabled a background task sends heartbeats and flushes
/// queued events until [`end`](Self::end), a fatal backend reply, or drop.
pub struct PlaybackSession {
    inner: Arc<Inner>,
    worker: Option<JoinHandle<()>>,
}

impl PlaybackSession {
    /// Start a session. Must be called inside a tokio runtime when the
    /// policy enables monitoring.
    #[must_use]
    pub fn start(client: ApiClient, options: PlaybackOptions, timers: PlaybackTimers) -> Self {
        let (ended, _) = watch::channel(None);
        let inner = Arc::new(Inner {
            client,
            video_id: options.video_id,
            enrollment_id: options.enrollment_id,
            seek: Mutex::new(SeekGuard::new(&options.policy)),
            rate: RateGuard::new(&options.policy),
            policy: options.policy,
            token: RwLock::new(options.token),
            queue: Mutex::new(EventQueue::default()),
            cancel: CancellationToken::new(),
            ended,
        });

        let worker = inner.policy.monitoring_enabled.then(|| {
            tracing::debug!(video_id = inner.video_id, "starting playback monitoring");
            tokio::spawn(run_timers(Arc::clone(&inner), timers))
        });
        Self { inner, worker }
    }

    #[must_use]
    pub fn policy(&self) -> &PlaybackPolicy {
        &self.inner.policy
    }

    #[must_use]
    pub fn token(&self) -> String {
        self.inner.token.read().clone()
    }

    /// Swap in a reissued playback token.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.inner.token.write() = token.into();
    }

    /// Receives the terminal reason once the backend ends the session.
    #[must_use]
    pub fn subscribe_end(&self) -> watch::Receiver<Option<SessionEnd>> {
        self.inner.ended.subscribe()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.inner.cancel.is_cancelled()
    }

    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.inner.queue.lock().len()
    }

    #[must_use]
    pub fn max_watched(&self) -> f64 {
        self.inner.seek.lock().max_watched()
    }

    /// Playback reached `position` seconds.
    pub fn record_position(&self, position: f64) {
        self.inner.seek.lock().observe(position);
    }

    /// Police a seek to `target`; a clamp is reported as `SEEK_ATTEMPT`.
    #[must_use]
    pub fn seek(&self, target: f64) -> SeekDecision {
        let decision = self.inner.seek.lock().check(target, Instant::now());
        if let SeekDecision::Clamp { attempt, .. } = &decision {
            self.inner.queue_event(EventType::SeekAttempt, attempt.clone());
        }
        decision
    }

    /// Returns the rate to apply for a requested `rate`.
    #[must_use]
    pub fn set_rate(&self, rate: f64) -> f64 {
        let decision = self.inner.rate.apply(rate);
        if let Some(payload) = decision.violation {
            self.inner.queue_event(EventType::SpeedChangeAttempt, payload);
        }
        decision.rate
    }

    /// The player became hidden or visible. Becoming visible renews the
    /// playback token while monitoring.
    pub async fn visibility_changed(&self, hidden: bool) {
        if hidden {
            self.inner
                .queue_event(EventType::VisibilityHidden, json!({ "hidden": true }));
        } else {
            self.inner
                .queue_event(EventType::VisibilityVisible, json!({ "hidden": false }));
            if self.inner.policy.monitoring_enabled {
                self.refresh().await;
            }
        }
    }

    pub fn focus_changed(&self, focused: bool) {
        let kind = if focused {
            EventType::FocusGained
        } else {
            EventType::FocusLost
        };
        self.inner.queue_event(kind, Value::Null);
    }

    pub fn fullscreen_changed(&self, entered: bool) {
        let kind = if entered {
            EventType::FullscreenEnter
        } else {
            EventType::FullscreenExit
        };
        self.inner.queue_event(kind, Value::Null);
    }

    pub fn player_error(&self, details: Value) {
        self.inner.queue_event(EventType::PlayerError, details);
    }

    pub async fn heartbeat(&self) {
        self.inner.heartbeat().await;
    }

    pub async fn flush_events(&self) {
        self.inner.flush_events().await;
    }

    /// Renew the playback token. Failures are logged only.
    pub async fn refresh(&self) {
        if let Err(e) = self.inner.post(REFRESH_PATH, &self.inner.token_body()).await {
            tracing::debug!(error = %e, "playback refresh failed");
        }
    }

    /// Progress so far against a media `duration` in seconds.
    #[must_use]
    pub fn progress(&self, duration: f64) -> ProgressReport {
        progress_report(self.max_watched(), duration)
    }

    /// Stop the timers and report the final progress. When monitored, the
    /// end notice and the remaining events are sent in the background.
    ///
    /// The background send dies with the runtime; a process about to exit
    /// should use [`finish`](Self::finish).
    #[must_use = "the final progress should be saved"]
    pub fn end(mut self, duration: f64) -> ProgressReport {
        self.stop();
        if self.inner.policy.monitoring_enabled {
            let inner = Arc::clone(&self.inner);
            drop(tokio::spawn(async move { inner.send_end().await }));
        }
        self.progress(duration)
    }

    /// Like [`end`](Self::end), but waits up to `timeout` for the end notice
    /// and the final event flush to complete.
    #[must_use = "the final progress should be saved"]
    pub async fn finish(mut self, duration: f64, timeout: Duration) -> ProgressReport {
        self.stop();
        let report = self.progress(duration);
        if self.inner.policy.monitoring_enabled
            && tokio::time::timeout(timeout, self.inner.send_end())
                .await
                .is_err()
        {
            tracing::warn!(
                video_id = self.inner.video_id,
                ?timeout,
                "playback end notice not delivered in time"
            );
        }
        report
    }

    fn stop(&mut self) {
        self.inner.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("video_id", &self.inner.video_id)
            .field("enrollment_id", &self.inner.enrollment_id)
            .field("monitoring", &self.inner.policy.monitoring_enabled)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn queue_event(&self, kind: EventType, payload: Value) {
        if !self.policy.monitoring_enabled || self.cancel.is_cancelled() {
            return;
        }
        if kind.is_violation() && !self.policy.reports_violations() {
            return;
        }
        self.queue.lock().push(PlaybackEvent::now(kind, payload));
    }

    fn token_body(&self) -> Value {
        let token = self.token.read();
        json!({ "token": token.as_str() })
    }

    fn is_local(&self) -> bool {
        let token = self.token.read();
        token.is_empty() || token.starts_with(LOCAL_TOKEN_PREFIX)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<(), ApiError> {
        if self.is_local() {
            return Ok(());
        }
        self.client.post(path).json(body).send().await?;
        Ok(())
    }

    async fn heartbeat(&self) {
        if let Err(e) = self.post(HEARTBEAT_PATH, &self.token_body()).await {
            self.on_failure("heartbeat", &e);
        }
    }

    async fn flush_events(&self) {
        if self.is_local() {
            return;
        }
        let batch = self.queue.lock().drain();
        if batch.is_empty() {
            return;
        }
        let body = {
            let token = self.token.read();
            serde_json::to_value(EventBatch {
                token: &token,
                video_id: self.video_id,
                enrollment_id: self.enrollment_id,
                events: &batch,
            })
        };
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode playback events");
                return;
            }
        };
        tracing::trace!(count = batch.len(), "flushing playback events");
        if let Err(e) = self.post(EVENTS_PATH, &body).await {
            self.on_failure("events", &e);
        }
    }

    async fn send_end(&self) {
        if let Err(e) = self.post(END_PATH, &self.token_body()).await {
            tracing::debug!(error = %e, "playback end notice failed");
        }
        self.flush_events().await;
    }

    fn on_failure(&self, call: &'static str, err: &ApiError) {
        let Some(reason) = SessionEnd::from_error(err) else {
            tracing::debug!(call, error = %err, "playback call failed");
            return;
        };
        let first = self.ended.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if first {
            tracing::warn!(video_id = self.video_id, %reason, "playback session ended by backend");
        }
        self.cancel.cancel();
    }
}

async fn run_timers(inner: Arc<Inner>, timers: PlaybackTimers) {
    let start = tokio::time::Instant::now();
    let mut flush = tokio::time::interval_at(start + timers.flush, timers.flush);
    let mut heartbeat = tokio::time::interval_at(start + timers.heartbeat, timers.heartbeat);
    flush.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = inner.cancel.cancelled() => {
                tracing::debug!(video_id = inner.video_id, "playback monitoring stopped");
                break;
            }
            _ = flush.tick() => inner.flush_events().await,
            _ = heartbeat.tick() => inner.heartbeat().await,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use academy_http::HttpClient;
    use academy_storage::{KeyValueStore, MemoryStore};
    use academy_tenant::TenantResolverConfig;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> ApiClient {
        let config = academy_api::ApiConfig {
            base_url: server.base_url(),
            ..Default::default()
        };
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let http = HttpClient::builder()
            .allow_insecure_http()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        ApiClient::from_config(&config, &TenantResolverConfig::default(), http, &store).unwrap()
    }

    fn options(token: &str, policy: &str) -> PlaybackOptions {
        PlaybackOptions {
            video_id: 7,
            enrollment_id: Some(11),
            token: token.to_owned(),
            policy: serde_json::from_str(policy).unwrap(),
        }
    }

    const PROCTORED: &str = r#"{"access_mode":"PROCTORED_CLASS","seek":{"mode":"blocked"},"playback_rate":{"max":2}}"#;

    fn idle() -> PlaybackTimers {
        PlaybackTimers {
            heartbeat: Duration::from_secs(3600),
            flush: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn unmonitored_sessions_queue_nothing() {
        let server = MockServer::start();
        let session = PlaybackSession::start(client(&server), options("t1", "{}"), idle());
        session.focus_changed(false);
        assert!((session.set_rate(8.0) - 8.0).abs() < f64::EPSILON);
        assert_eq!(session.pending_events(), 0);
        assert!(session.worker.is_none());
    }

    #[tokio::test]
    async fn free_review_drops_violations_only() {
        let server = MockServer::start();
        let session = PlaybackSession::start(
            client(&server),
            options(
                "t1",
                r#"{"access_mode":"FREE_REVIEW","monitoring_enabled":true,"allow_seek":false}"#,
            ),
            idle(),
        );
        assert!(matches!(session.seek(30.0), SeekDecision::Clamp { .. }));
        session.fullscreen_changed(true);
        assert_eq!(session.pending_events(), 1);
    }

    #[tokio::test]
    async fn flush_posts_batch_and_empties_queue() {
        let server = MockServer::start();
        let events = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/videos/playback/events/")
                .body_includes(r#""token":"t1""#)
                .body_includes(r#""video_id":7"#)
                .body_includes(r#""enrollment_id":11"#)
                .body_includes("SEEK_ATTEMPT")
                .body_includes("SPEED_CHANGE_ATTEMPT");
            then.status(200).json_body(json!({"ok": true}));
        });

        let session = PlaybackSession::start(client(&server), options("t1", PROCTORED), idle());
        session.record_position(12.0);
        assert!(matches!(session.seek(40.0), SeekDecision::Clamp { .. }));
        assert!((session.set_rate(4.0) - 2.0).abs() < f64::EPSILON);
        assert_eq!(session.pending_events(), 2);

        session.flush_events().await;
        events.assert();
        assert_eq!(session.pending_events(), 0);

        session.flush_events().await;
        assert_eq!(events.calls(), 1, "empty queue is not sent");
    }

    #[tokio::test]
    async fn local_tokens_never_reach_the_network() {
        let server = MockServer::start();
        let mocks: Vec<_> = [HEARTBEAT_PATH, REFRESH_PATH, END_PATH, EVENTS_PATH]
            .into_iter()
            .map(|path| {
                server.mock(|when, then| {
                    when.method(POST).path(format!("/api/v1{path}"));
                    then.status(200);
                })
            })
            .collect();
        let session = PlaybackSession::start(
            client(&server),
            options("student-7", PROCTORED),
            idle(),
        );
        session.focus_changed(false);
        session.heartbeat().await;
        session.flush_events().await;
        session.refresh().await;
        assert!(mocks.iter().all(|m| m.calls() == 0));
        assert_eq!(session.pending_events(), 1);
    }

    #[tokio::test]
    async fn conflict_ends_the_session() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/videos/playback/heartbeat/");
            then.status(409).json_body(json!({"detail": "conflict"}));
        });
        let session = PlaybackSession::start(client(&server), options("t1", PROCTORED), idle());
        let ended = session.subscribe_end();

        session.heartbeat().await;
        assert_eq!(*ended.borrow(), Some(SessionEnd::SessionInactive));
        assert!(!session.is_active());

        session.focus_changed(false);
        assert_eq!(session.pending_events(), 0, "no events after the end");
    }

    #[tokio::test]
    async fn policy_change_is_reported_once() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/videos/playback/heartbeat/");
            then.status(400).json_body(json!({"detail": "policy_changed"}));
        });
        let session = PlaybackSession::start(client(&server), options("t1", PROCTORED), idle());
        let mut ended = session.subscribe_end();

        session.heartbeat().await;
        session.heartbeat().await;
        assert!(ended.has_changed().unwrap());
        assert_eq!(*ended.borrow_and_update(), Some(SessionEnd::PolicyChanged));
        assert!(!ended.has_changed().unwrap());
    }

    #[tokio::test]
    async fn transient_failures_are_ignored() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/videos/playback/heartbeat/");
            then.status(500);
        });
        let session = PlaybackSession::start(client(&server), options("t1", PROCTORED), idle());
        session.heartbeat().await;
        assert!(session.is_active());
        assert!(session.subscribe_end().borrow().is_none());
    }

    #[tokio::test]
    async fn timers_drive_heartbeat_and_flush() {
        let server = MockServer::start();
        let heartbeat = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/videos/playback/heartbeat/")
                .json_body(json!({"token": "t1"}));
            then.status(200);
        });
        let events = server.mock(|when, then| {
            when.method(POST).path("/api/v1/videos/playback/events/");
            then.status(200);
        });

        let timers = PlaybackTimers {
            heartbeat: Duration::from_millis(100),
            flush: Duration::from_millis(40),
        };
        let session = PlaybackSession::start(client(&server), options("t1", PROCTORED), timers);
        session.focus_changed(false);
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert!(heartbeat.calls() >= 1);
        assert_eq!(events.calls(), 1);
        assert_eq!(session.pending_events(), 0);
    }

    #[tokio::test]
    async fn end_notifies_backend_and_reports_progress() {
        let server = MockServer::start();
        let end = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/videos/playback/end/")
                .json_body(json!({"token": "t1"}));
            then.status(200);
        });

        let session = PlaybackSession::start(client(&server), options("t1", PROCTORED), idle());
        session.record_position(59.6);
        let report = session.end(60.0);
        assert!(report.completed);
        assert_eq!(report.last_position, 60);

        for _ in 0..50 {
            if end.calls() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        end.assert();
    }

    #[tokio::test]
    async fn finish_waits_for_end_notice_and_final_flush() {
        let server = MockServer::start();
        let end = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/videos/playback/end/")
                .json_body(json!({"token": "t1"}));
            then.status(200);
        });
        let events = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/videos/playback/events/")
                .body_includes("FOCUS_LOST");
            then.status(200);
        });

        let session = PlaybackSession::start(client(&server), options("t1", PROCTORED), idle());
        session.record_position(30.0);
        session.focus_changed(false);
        let report = session.finish(60.0, Duration::from_secs(5)).await;

        end.assert();
        events.assert();
        assert!((report.progress - 50.0).abs() < f64::EPSILON);
        assert!(!report.completed);
    }

    #[tokio::test]
    async fn finish_gives_up_after_timeout() {
        let server = MockServer::start();
        let end = server.mock(|when, then| {
            when.method(POST).path("/api/v1/videos/playback/end/");
            then.status(200).delay(Duration::from_secs(2));
        });

        let session = PlaybackSession::start(client(&server), options("t1", PROCTORED), idle());
        session.record_position(60.0);
        let started = Instant::now();
        let report = session.finish(60.0, Duration::from_millis(100)).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(report.completed);
        assert!(end.calls() <= 1);
    }

    #[tokio::test]
    async fn unmonitored_finish_makes_no_calls() {
        let server = MockServer::start();
        let end = server.mock(|when, then| {
            when.method(POST).path("/api/v1/videos/playback/end/");
            then.status(200);
        });
        let session = PlaybackSession::start(client(&server), options("t1", "{}"), idle());
        session.record_position(10.0);
        let report = session.finish(20.0, Duration::from_secs(1)).await;
        assert_eq!(report.last_position, 10);
        assert_eq!(end.calls(), 0);
    }

    #[tokio::test]
    async fn becoming_visible_refreshes_the_token() {
        let server = MockServer::start();
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/videos/playback/refresh/")
                .json_body(json!({"token": "t2"}));
            then.status(200);
        });
        let session = PlaybackSession::start(client(&server), options("t1", PROCTORED), idle());
        session.set_token("t2");
        session.visibility_changed(true).await;
        assert_eq!(refresh.calls(), 0);
        session.visibility_changed(false).await;
        refresh.assert();
        assert_eq!(session.pending_events(), 2);
    }
}
