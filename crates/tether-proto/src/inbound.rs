//! Inbound frames.
//!
//! Inbound frames are classified only by their `type` tag. The rest of the
//! object is retained as-is so listeners can read whatever they need.
//!
//! Parsing rejects text that is not a JSON object. An object without a
//! string `type` is still accepted with an empty kind; classification then
//! routes it to the catch-all `unknown` event instead of dropping it.

use serde_json::{Map, Value};

use crate::{
    errors::{ProtocolError, Result},
    outbound::json_type,
};

/// Largest inbound frame accepted (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// A parsed server frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    kind: String,
    fields: Map<String, Value>,
}

impl InboundFrame {
    /// Build a frame from a kind and fields. Mostly useful in tests.
    pub fn new(kind: impl Into<String>, fields: Map<String, Value>) -> Self {
        let kind = kind.into();
        let mut fields = fields;
        fields.insert("type".to_string(), Value::String(kind.clone()));
        Self { kind, fields }
    }

    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self> {
        if text.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: text.len(), max: MAX_FRAME_SIZE });
        }

        let value: Value = serde_json::from_str(text)?;
        let Value::Object(fields) = value else {
            return Err(ProtocolError::NotAnObject { found: json_type(&value) });
        };

        let kind = fields.get("type").and_then(Value::as_str).unwrap_or_default().to_string();
        Ok(Self { kind, fields })
    }

    /// The `type` tag, or an empty string if the frame had none.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// All fields, including `type`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Raw field lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Reply or notice text. Assistant replies use `message`; the HTTP-shaped
    /// reply uses `response`.
    pub fn text(&self) -> Option<&str> {
        self.str_field("message").or_else(|| self.str_field("response"))
    }

    /// Assistant confidence score.
    pub fn confidence(&self) -> Option<f64> {
        self.fields.get("confidence").and_then(Value::as_f64)
    }

    /// Context annotation attached to a reply.
    pub fn context(&self) -> Option<&Value> {
        self.fields.get("context").filter(|value| !value.is_null())
    }

    /// Typing flag of a `typing` frame.
    pub fn is_typing(&self) -> Option<bool> {
        self.fields.get("is_typing").and_then(Value::as_bool)
    }

    /// Server-side timestamp, verbatim.
    pub fn timestamp(&self) -> Option<&str> {
        self.str_field("timestamp")
    }

    /// Session the frame belongs to.
    pub fn session_id(&self) -> Option<&str> {
        self.str_field("session_id")
    }

    /// Whether this is an `error` frame naming `kind` as the unrecognised
    /// message type, e.g. `"Tipo de mensaje no reconocido: ping"`.
    pub fn rejects_kind(&self, kind: &str) -> bool {
        self.kind == "error"
            && self
                .text()
                .and_then(|text| text.trim_end().rsplit_once(':'))
                .is_some_and(|(_, rejected)| rejected.trim() == kind)
    }

    /// Whole frame as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}
