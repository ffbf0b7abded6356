//! External event model.
//!
//! The backend delivers asynchronous push notifications on a single broadcast
//! channel. Flows subscribe per instance and drop every event whose subject
//! does not match their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::SubjectId;

/// Device event payload signalling that the device status changed and should
/// be pulled again.
pub const STATUS_CHANGED: &str = "statusChanged";
/// Device event payload signalling that the pairing channel hash changed.
pub const CHANNEL_HASH_CHANGED: &str = "channelHashChanged";

/// Category tag of an external event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Device,
    Backend,
}

/// A tagged notification received from the backend event channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalEvent {
    pub category: EventCategory,
    /// Subject the event concerns; `None` for broadcast-wide notices.
    pub subject: Option<SubjectId>,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

impl ExternalEvent {
    pub fn new(category: EventCategory, subject: Option<SubjectId>, payload: Value) -> Self {
        Self {
            category,
            subject,
            payload,
            received_at: Utc::now(),
        }
    }

    /// Device event with a plain string payload, the shape the device backend
    /// emits for lifecycle signals.
    pub fn device(subject: SubjectId, data: &str) -> Self {
        Self::new(EventCategory::Device, Some(subject), Value::String(data.to_string()))
    }

    /// Whether this event concerns the given subject. Events without a
    /// subject concern every flow.
    pub fn concerns(&self, subject: &SubjectId) -> bool {
        match &self.subject {
            Some(s) => s == subject,
            None => true,
        }
    }

    /// String payload, if the payload is a plain string.
    pub fn data(&self) -> Option<&str> {
        self.payload.as_str()
    }
}
