use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

/// Monitoring event kinds understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    VisibilityHidden,
    VisibilityVisible,
    FocusLost,
    FocusGained,
    SeekAttempt,
    SpeedChangeAttempt,
    FullscreenEnter,
    FullscreenExit,
    PlayerError,
}

impl EventType {
    /// Policy violations, dropped in free review.
    #[must_use]
    pub fn is_violation(self) -> bool {
        matches!(self, Self::SeekAttempt | Self::SpeedChangeAttempt)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackEvent {
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Unix seconds.
    pub occurred_at: u64,
    pub payload: Value,
}

impl PlaybackEvent {
    #[must_use]
    pub fn now(kind: EventType, payload: Value) -> Self {
        let occurred_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self {
            kind,
            occurred_at,
            payload: if payload.is_null() {
                Value::Object(serde_json::Map::new())
            } else {
                payload
            },
        }
    }
}

/// Bounded FIFO of pending events; the oldest are dropped on overflow.
#[derive(Debug)]
pub struct EventQueue {
    events: VecDeque<PlaybackEvent>,
    capacity: usize,
}

pub const EVENT_QUEUE_CAPACITY: usize = 300;

impl Default for EventQueue {
    fn default() -> Self {
        Self::with_capacity(EVENT_QUEUE_CAPACITY)
    }
}

impl EventQueue {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, event: PlaybackEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Take everything queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
