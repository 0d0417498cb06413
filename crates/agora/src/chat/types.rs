//! Chat message and configuration types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message posted to the shared room. Immutable once stamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Stamp an inbound frame with a fresh id and the current time.
    pub fn stamp(inbound: InboundMessage) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: inbound.user_id,
            username: inbound.username,
            text: inbound.text,
            timestamp: Utc::now(),
        }
    }
}

/// A frame as submitted by a client. Any `id` or `timestamp` the client
/// sends is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InboundMessage {
    pub user_id: String,
    pub username: String,
    pub text: String,
}

/// Upper bound on replay history, whatever the configuration says.
pub const MAX_HISTORY_CAPACITY: usize = 100;

/// Chat room settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Messages kept for replay to new members, at most
    /// [`MAX_HISTORY_CAPACITY`].
    pub history_capacity: usize,
    /// Messages buffered per connection before it is dropped as too slow.
    pub connection_buffer: usize,
    /// Seconds between keepalive pings.
    pub ping_interval_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_capacity: MAX_HISTORY_CAPACITY,
            connection_buffer: 64,
            ping_interval_secs: 30,
        }
    }
}

/// Response body of `GET /api/chat/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    pub data: Vec<ChatMessage>,
}
