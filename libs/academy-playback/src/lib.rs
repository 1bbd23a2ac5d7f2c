#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Student video playback on top of [`academy_api::ApiClient`].
//!
//! [`PlaybackSession`] enforces the seek and speed policy for one video and,
//! for monitored viewings, reports heartbeats and viewer events to the
//! backend until the session ends.

mod error;
mod events;
mod guards;
mod info;
mod policy;
mod progress;
mod session;

pub use error::PlaybackError;
pub use events::{EVENT_QUEUE_CAPACITY, EventQueue, EventType, PlaybackEvent};
pub use guards::{RateDecision, RateGuard, SEEK_WARNING_INTERVAL, SeekDecision, SeekGuard};
pub use info::{PlaybackInfo, VideoSummary, fetch_playback};
pub use policy::{AccessMode, PlaybackPolicy, RatePolicy, SeekMode, SeekPolicy};
pub use progress::{ProgressRecord, ProgressReport, progress_report, update_progress};
pub use session::{
    END_PATH, EVENTS_PATH, HEARTBEAT_PATH, LOCAL_TOKEN_PREFIX, PlaybackOptions, PlaybackSession,
    PlaybackTimers, REFRESH_PATH, SessionEnd,
};
