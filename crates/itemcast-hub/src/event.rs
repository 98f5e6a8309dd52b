//! Event model for real-time updates.
//!
//! An [`Event`] is encoded to JSON exactly once, before fan-out. The
//! resulting [`Frame`] is shared read-only by every subscriber queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Encoded wire message, shared by all recipients of one broadcast.
pub type Frame = Arc<str>;

/// Kind of state change carried by an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[non_exhaustive]
pub enum EventKind {
    /// A resource was created.
    #[serde(rename = "ITEM_CREATED")]
    Created,
    /// A resource was updated.
    #[serde(rename = "ITEM_UPDATED")]
    Updated,
    /// A resource was deleted.
    #[serde(rename = "ITEM_DELETED")]
    Deleted,
}

impl EventKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "ITEM_CREATED",
            Self::Updated => "ITEM_UPDATED",
            Self::Deleted => "ITEM_DELETED",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification broadcast to every live subscriber.
#[derive(Clone, Debug, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: EventKind,
    payload: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl Event {
    /// Build an event stamped with the current time.
    ///
    /// Fails when the payload cannot be represented as JSON, e.g. a map
    /// with non-string keys.
    pub fn new<P: Serialize>(kind: EventKind, payload: P) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind,
            payload: serde_json::to_value(payload)?,
            timestamp: Utc::now(),
        })
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Serialize into the shared wire frame.
    pub fn encode(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }
}
