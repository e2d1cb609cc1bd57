//! Chat message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::{deserialize_id, deserialize_optional_id};

/// Two messages with equal content whose timestamps are closer than this are
/// the same message seen twice (typically our own send echoed back).
pub const DUPLICATE_WINDOW_MS: i64 = 5_000;

/// A stored chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub content: String,
    /// Creation instant, stored as ISO-8601
    pub timestamp: DateTime<Utc>,
    /// Local origin (`true`) or received over the channel (`false`)
    pub is_from_me: bool,
}

impl Message {
    /// A message composed on this device
    #[must_use]
    pub fn outgoing(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            content: content.into(),
            timestamp: Utc::now(),
            is_from_me: true,
        }
    }

    /// Build the stored form of an inbound message, filling in what the
    /// sender left out.
    #[must_use]
    pub fn received(incoming: IncomingMessage) -> Self {
        Self {
            id: incoming.id.unwrap_or_else(|| Uuid::now_v7().to_string()),
            content: incoming.content,
            timestamp: incoming.timestamp.unwrap_or_else(Utc::now),
            is_from_me: false,
        }
    }

    /// Whether `content` at `timestamp` would duplicate this message.
    pub fn is_duplicate_of(&self, content: &str, timestamp: DateTime<Utc>) -> bool {
        self.content == content
            && (self.timestamp - timestamp).num_milliseconds().abs() < DUPLICATE_WINDOW_MS
    }
}

/// Inbound message payload as pushed by the realtime channel or listed by
/// the message history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Sender's client identifier
    #[serde(default)]
    pub identifier: Option<String>,
}

impl IncomingMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            timestamp: None,
            identifier: None,
        }
    }

    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Whether this message was sent by the client identified by `identifier`.
    pub fn is_from(&self, identifier: &str) -> bool {
        self.identifier.as_deref() == Some(identifier)
    }
}
