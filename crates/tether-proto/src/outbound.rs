//! Outbound frames.
//!
//! The client sends typed payloads. Before transmission each payload is
//! stamped with a generated id and the wall-clock time of the `send` call,
//! producing an [`Envelope`]. The wire form is the payload object with the
//! `timestamp` and `id` fields merged in:
//!
//! ```text
//! { "type": "message", "message": "hola", "session_id": "s1",
//!   "history": [], "timestamp": "2026-01-02T03:04:05.006Z", "id": "msg_..." }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ProtocolError, Result};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the local user.
    User,
    /// Produced by the remote assistant.
    Assistant,
}

/// One prior turn sent along with a chat message as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    /// Who wrote the turn.
    pub role: Role,
    /// Turn text.
    pub content: String,
}

/// Payloads the client can send.
///
/// Serialized with an internal `type` tag, so `Ping` becomes
/// `{"type":"ping"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundPayload {
    /// A chat message for the assistant.
    Message {
        /// Message text.
        message: String,
        /// Conversation session, if one has been established.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        /// Trailing window of prior turns.
        #[serde(default)]
        history: Vec<HistoryTurn>,
    },

    /// Typing indicator.
    Typing {
        /// Whether the user is currently typing.
        is_typing: bool,
        /// Identifier of the typing user.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },

    /// Update of the user's long-lived context (preferences, topics).
    ContextUpdate {
        /// Session whose context is updated.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        /// Free-form preference map.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preferences: Option<Value>,
        /// Topics of interest.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topics: Option<Vec<String>>,
        /// Personality settings for the assistant.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        personality: Option<Value>,
    },

    /// Liveness ping. The server answers with `pong`.
    Ping,

    /// Command on the admin channel.
    AdminCommand {
        /// Command name (`get_stats`, `get_connections`, `broadcast`).
        command: String,
        /// Command-specific extra fields.
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl OutboundPayload {
    /// Wire name of this payload's `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Typing { .. } => "typing",
            Self::ContextUpdate { .. } => "context_update",
            Self::Ping => "ping",
            Self::AdminCommand { .. } => "admin_command",
        }
    }

    /// Build a chat message payload.
    pub fn message(
        message: impl Into<String>,
        session_id: Option<String>,
        history: Vec<HistoryTurn>,
    ) -> Self {
        Self::Message { message: message.into(), session_id, history }
    }

    /// Build an admin command with no extra fields.
    pub fn admin(command: impl Into<String>) -> Self {
        Self::AdminCommand { command: command.into(), extra: Map::new() }
    }
}

/// A payload plus its delivery metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Generated message id.
    pub id: String,
    /// Wall-clock time of the `send` call.
    pub timestamp: DateTime<Utc>,
    /// The payload itself.
    pub payload: OutboundPayload,
}

impl Envelope {
    /// Wrap a payload.
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>, payload: OutboundPayload) -> Self {
        Self { id: id.into(), timestamp, payload }
    }

    /// Encode to the JSON text sent on the wire.
    pub fn encode(&self) -> Result<String> {
        let mut value = serde_json::to_value(&self.payload)?;
        let Value::Object(fields) = &mut value else {
            return Err(ProtocolError::NotAnObject { found: json_type(&value) });
        };

        fields.insert(
            "timestamp".to_string(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        fields.insert("id".to_string(), Value::String(self.id.clone()));

        Ok(value.to_string())
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
