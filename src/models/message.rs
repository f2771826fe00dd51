use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A chat message as supplied by a client
///
/// The payload is opaque: whatever JSON the sender produced is stored and
/// relayed verbatim. Clients are expected to include a `text` field but
/// nothing enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatMessage(Value);

impl ChatMessage {
    /// Build a message carrying only a `text` field
    pub fn text_only(text: impl Into<String>) -> Self {
        Self(serde_json::json!({ "text": text.into() }))
    }

    /// The `text` field, if present and a string
    pub fn text(&self) -> Option<&str> {
        self.0.get("text").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for ChatMessage {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
