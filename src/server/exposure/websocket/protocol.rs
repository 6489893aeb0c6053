//! WebSocket message protocol definitions
//!
//! Every frame is a UTF-8 JSON object with a `type` discriminator.
//!
//! ## Client → Server Messages
//!
//! ```json
//! // Choose or change a nickname
//! {"type": "nickname", "nickname": "alice"}
//!
//! // Send a chat message to everyone
//! {"type": "message", "message": "hi"}
//! ```
//!
//! Frames with any other `type` (or none) are ignored.
//!
//! ## Server → Client Messages
//!
//! ```json
//! // Sent once, right after connecting
//! {"type": "meta", "sid": "<uuid>", "timestamp": "2024-01-01T00:00:00.000Z"}
//!
//! // Join/rename/departure notices, and parse errors (unicast)
//! {"type": "system", "message": "alice joined.", "timestamp": "..."}
//!
//! // Relayed chat message
//! {"type": "user", "user": "alice", "message": "hi", "senderSid": "<uuid>", "timestamp": "..."}
//! ```

use crate::core::error::ProtocolError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Identity-set: choose or change a nickname
    Nickname {
        /// Raw candidate, not yet trimmed
        nickname: String,
    },
    /// Chat-send: relay a message to every participant
    Message {
        /// Message body
        message: String,
    },
    /// Any other frame kind, kept for forward compatibility
    Unknown,
}

impl ClientMessage {
    /// Parse one inbound text frame
    ///
    /// Only invalid JSON is an error. A well-formed frame with an unrecognized
    /// or missing `type` parses to [`ClientMessage::Unknown`].
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;

        let message = match value.get("type").and_then(Value::as_str) {
            Some("nickname") => ClientMessage::Nickname {
                nickname: coerce_text(value.get("nickname")),
            },
            Some("message") => ClientMessage::Message {
                message: coerce_text(value.get("message")),
            },
            _ => ClientMessage::Unknown,
        };

        Ok(message)
    }
}

/// Coerce a JSON field to text: absent and `null` become the empty string
fn coerce_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection metadata, unicast on connect
    Meta {
        /// The session id assigned to this connection
        sid: Uuid,
        /// ISO-8601 timestamp
        timestamp: String,
    },
    /// System notice (join, rename, departure, or error)
    System {
        /// Human-readable notice
        message: String,
        /// ISO-8601 timestamp
        timestamp: String,
    },
    /// Relayed chat message
    User {
        /// Sender's nickname, or display id when no nickname is set
        user: String,
        /// Message body
        message: String,
        /// Sender's session id
        #[serde(rename = "senderSid")]
        sender_sid: Uuid,
        /// ISO-8601 timestamp
        timestamp: String,
    },
}

impl ServerMessage {
    /// Connection metadata frame
    pub fn meta(sid: Uuid) -> Self {
        ServerMessage::Meta {
            sid,
            timestamp: timestamp(),
        }
    }

    /// System notice frame
    pub fn system(message: impl Into<String>) -> Self {
        ServerMessage::System {
            message: message.into(),
            timestamp: timestamp(),
        }
    }

    /// Chat relay frame
    pub fn user(user: impl Into<String>, message: impl Into<String>, sender_sid: Uuid) -> Self {
        ServerMessage::User {
            user: user.into(),
            message: message.into(),
            sender_sid,
            timestamp: timestamp(),
        }
    }
}

/// Current UTC time as ISO-8601 with millisecond precision
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
