//! Motion event — an immutable push notification from the remote service.
//!
//! The transport builds one [`MotionEvent`] per notification. A single
//! physical motion produces one event with `is_update == false` followed by
//! zero or more updates carrying the same [`EventId`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, EventId};
use crate::time::{Timestamp, now};

/// How long an event stays relevant when the notification does not say.
pub const DEFAULT_EXPIRES_IN_SECS: u32 = 180;

/// Category of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Motion,
    Ding,
    Other(String),
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "motion" => Self::Motion,
            "ding" => Self::Ding,
            _ => Self::Other(value),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.to_string()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Motion => f.write_str("motion"),
            Self::Ding => f.write_str("ding"),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// A notification delivered by the event transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    pub id: EventId,
    #[serde(rename = "doorbot_id")]
    pub device_id: DeviceId,
    #[serde(default)]
    pub device_name: String,
    pub kind: EventKind,
    /// Sub-classification, e.g. `person` or `vehicle`.
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub is_update: bool,
    #[serde(rename = "expires_in", default)]
    pub expires_in_secs: u32,
    #[serde(default = "now")]
    pub received_at: Timestamp,
}

impl MotionEvent {
    /// Create a builder for a notification about `device_id`.
    #[must_use]
    pub fn builder(id: EventId, device_id: DeviceId) -> MotionEventBuilder {
        MotionEventBuilder {
            event: Self {
                id,
                device_id,
                device_name: String::new(),
                kind: EventKind::Motion,
                state: String::new(),
                is_update: false,
                expires_in_secs: DEFAULT_EXPIRES_IN_SECS,
                received_at: now(),
            },
        }
    }

    #[must_use]
    pub fn is_motion(&self) -> bool {
        self.kind == EventKind::Motion
    }

    /// How long this event identity should be remembered.
    ///
    /// Falls back to [`DEFAULT_EXPIRES_IN_SECS`] when the notification
    /// carries no expiry.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        let secs = if self.expires_in_secs == 0 {
            DEFAULT_EXPIRES_IN_SECS
        } else {
            self.expires_in_secs
        };
        Duration::from_secs(u64::from(secs))
    }
}

/// Builder for [`MotionEvent`]; ids are validated by their own types.
#[derive(Debug)]
pub struct MotionEventBuilder {
    event: MotionEvent,
}

impl MotionEventBuilder {
    #[must_use]
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.event.device_name = name.into();
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: EventKind) -> Self {
        self.event.kind = kind;
        self
    }

    #[must_use]
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.event.state = state.into();
        self
    }

    #[must_use]
    pub fn update(mut self, is_update: bool) -> Self {
        self.event.is_update = is_update;
        self
    }

    #[must_use]
    pub fn expires_in_secs(mut self, secs: u32) -> Self {
        self.event.expires_in_secs = secs;
        self
    }

    #[must_use]
    pub fn build(self) -> MotionEvent {
        self.event
    }
}
