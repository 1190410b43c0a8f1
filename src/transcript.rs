//! Backend message decoding.
//!
//! The speech backend talks to the front-end through two channels, both
//! JSON:
//!
//! - a **transcript** stream, one message per recognized utterance:
//!   `{"event": .., "text": "..", "keywords": ["..", ..], "timestamp": ..}`
//! - a polled **status** endpoint: `{"event_id": 999, "text": ".."}`
//!
//! Only decoding lives here; transport is the host's business. Keywords feed
//! [`Simulation::spawn`](crate::Simulation::spawn), and status updates are
//! reduced to an [`ActivitySignal`] that drives the idle factor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::TranscriptError;

/// Status id meaning "nothing is happening".
pub const EVENT_IDLE: i64 = 999;
/// Status id the backend keeps reporting while its reply audio plays.
pub const EVENT_SPEAKING: i64 = 359;

/// One transcript message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    #[serde(default)]
    pub event: Value,
    #[serde(default)]
    pub text: Option<String>,
    /// Expected to be an array of strings; anything else carries no keywords.
    #[serde(default)]
    pub keywords: Value,
    #[serde(default)]
    pub timestamp: Value,
}

impl TranscriptMessage {
    pub fn parse(json: &str) -> Result<Self, TranscriptError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Non-empty keyword strings, trimmed, in message order.
    pub fn keywords(&self) -> Vec<&str> {
        let Some(list) = self.keywords.as_array() else {
            return Vec::new();
        };
        list.iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Keywords from one line of host input.
///
/// Lines starting with `{` are decoded as a [`TranscriptMessage`]; anything
/// else is split on commas and whitespace. Malformed JSON is logged and
/// yields nothing.
pub fn keywords_from_line(line: &str) -> Vec<String> {
    let line = line.trim();
    if line.starts_with('{') {
        return match TranscriptMessage::parse(line) {
            Ok(msg) => msg.keywords().into_iter().map(str::to_string).collect(),
            Err(err) => {
                warn!(%err, "ignoring malformed transcript line");
                Vec::new()
            }
        };
    }
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// One reading of the status endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub event_id: i64,
    #[serde(default)]
    pub text: Option<String>,
}

impl StatusUpdate {
    pub fn parse(json: &str) -> Result<Self, TranscriptError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// What the backend's state means for the blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActivitySignal {
    /// Full-strength forces.
    Active,
    /// Forces scaled down so the blob settles.
    Idle,
}

impl ActivitySignal {
    pub fn from_event_id(event_id: i64) -> Self {
        if event_id == EVENT_IDLE {
            ActivitySignal::Idle
        } else {
            ActivitySignal::Active
        }
    }
}

/// Turns a stream of status polls into activity changes.
///
/// Repeated ids are swallowed. A speaking status is treated as idle once the
/// host reports its audio queue has drained, since the backend can lag
/// behind the end of playback.
#[derive(Clone, Debug, Default)]
pub struct StatusTracker {
    current: Option<i64>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event id currently in effect.
    pub fn current(&self) -> Option<i64> {
        self.current
    }

    /// Feed one status reading; returns a signal only when the effective id changes.
    pub fn observe(&mut self, update: &StatusUpdate, audio_idle: bool) -> Option<ActivitySignal> {
        let mut event_id = update.event_id;
        if event_id == EVENT_SPEAKING && audio_idle {
            event_id = EVENT_IDLE;
        }
        if self.current == Some(event_id) {
            return None;
        }
        self.current = Some(event_id);
        Some(ActivitySignal::from_event_id(event_id))
    }

    /// Like [`observe`](Self::observe) for raw JSON; bad payloads are logged and skipped.
    pub fn observe_json(&mut self, json: &str, audio_idle: bool) -> Option<ActivitySignal> {
        match StatusUpdate::parse(json) {
            Ok(update) => self.observe(&update, audio_idle),
            Err(err) => {
                warn!(%err, "ignoring malformed status payload");
                None
            }
        }
    }
}
