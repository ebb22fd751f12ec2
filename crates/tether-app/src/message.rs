//! Conversation entries.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tether_proto::{HistoryTurn, Role};

/// One entry in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Local id.
    pub id: String,
    /// Who said it.
    pub role: Role,
    /// Text.
    pub content: String,
    /// When it was sent or received.
    pub timestamp: DateTime<Utc>,
    /// Model confidence, assistant entries only.
    pub confidence: Option<f64>,
    /// Context annotation from the server, assistant entries only.
    pub context: Option<Value>,
}

impl Message {
    /// A user entry.
    pub fn user(id: String, content: String, timestamp: DateTime<Utc>) -> Self {
        Self { id, role: Role::User, content, timestamp, confidence: None, context: None }
    }

    /// An assistant entry.
    pub fn assistant(
        id: String,
        content: String,
        timestamp: DateTime<Utc>,
        confidence: Option<f64>,
        context: Option<Value>,
    ) -> Self {
        Self { id, role: Role::Assistant, content, timestamp, confidence, context }
    }

    /// The `{role, content}` pair sent as history.
    pub fn as_turn(&self) -> HistoryTurn {
        HistoryTurn { role: self.role, content: self.content.clone() }
    }
}
