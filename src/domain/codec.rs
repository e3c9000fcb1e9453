//! Wire encoding of [`Message`] envelopes.
//!
//! The pumps only ever talk to the [`Codec`] trait; [`JsonCodec`] is the
//! default and is what every hub uses unless the host swaps it out.

use super::Message;
use crate::error::HubError;

/// Serialization collaborator used by the pumps.
///
/// Implementations must round-trip `action` exactly and carry `data`
/// unchanged for every value they support.
pub trait Codec: Send + Sync + std::fmt::Debug {
    /// Encodes a message into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Encode`] if the message cannot be represented.
    fn encode(&self, message: &Message) -> Result<String, HubError>;

    /// Decodes a text frame into a message.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Decode`] if the frame is malformed.
    fn decode(&self, frame: &str) -> Result<Message, HubError>;
}

/// JSON codec: `{"a": "<action>", "d": <payload>}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, message: &Message) -> Result<String, HubError> {
        serde_json::to_string(message).map_err(|e| HubError::Encode(e.to_string()))
    }

    fn decode(&self, frame: &str) -> Result<Message, HubError> {
        serde_json::from_str(frame).map_err(|e| HubError::Decode(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_payload_survives_round_trip() {
        let msg = Message::new("move", json!({"x": 1, "path": [1, 2, {"z": null}]}));
        let Ok(frame) = JsonCodec.encode(&msg) else {
            panic!("encode failed");
        };
        let Ok(decoded) = JsonCodec.decode(&frame) else {
            panic!("decode failed");
        };
        assert_eq!(decoded, msg);
    }

    #[test]
    fn malformed_frame_is_decode_error() {
        let err = JsonCodec.decode("{not json");
        assert!(matches!(err, Err(HubError::Decode(_))));
    }

    #[test]
    fn frame_without_action_is_decode_error() {
        let err = JsonCodec.decode(r#"{"d": 1}"#);
        assert!(matches!(err, Err(HubError::Decode(_))));
    }
}
