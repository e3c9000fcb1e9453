//! The action/payload envelope exchanged between connections.

use serde::{Deserialize, Serialize};

/// Unit of exchange: an action name plus an opaque payload.
///
/// The hub never interprets `data`; it is carried as a
/// [`serde_json::Value`] so any structurally-typed payload round-trips.
/// On the wire the fields are named `"a"` and `"d"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "a")]
    action: String,
    #[serde(rename = "d", default)]
    data: serde_json::Value,
}

impl Message {
    /// Creates a new envelope.
    #[must_use]
    pub fn new(action: impl Into<String>, data: impl Into<serde_json::Value>) -> Self {
        Self {
            action: action.into(),
            data: data.into(),
        }
    }

    /// Returns the action name used to select a handler.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the opaque payload.
    #[must_use]
    pub const fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Splits the envelope into action and payload.
    #[must_use]
    pub fn into_parts(self) -> (String, serde_json::Value) {
        (self.action, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uses_short_wire_keys() {
        let msg = Message::new("x", "hi");
        let json = serde_json::to_value(&msg).unwrap_or_default();
        assert_eq!(json, json!({"a": "x", "d": "hi"}));
    }

    #[test]
    fn missing_payload_decodes_as_null() {
        let msg: Option<Message> = serde_json::from_str(r#"{"a":"ping"}"#).ok();
        assert_eq!(msg.map(|m| m.data().is_null()), Some(true));
    }

    #[test]
    fn into_parts_returns_fields() {
        let (action, data) = Message::new("y", 1).into_parts();
        assert_eq!(action, "y");
        assert_eq!(data, json!(1));
    }
}
