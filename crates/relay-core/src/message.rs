//! The chat payload relayed between clients.

use serde::{Deserialize, Serialize};

use crate::errors::{RecvError, SendError};

/// One chat message as it travels through the hub.
///
/// Both fields are required on the wire; unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Free-form message body.
    pub text: String,
    /// Free-form sender label supplied by the client.
    pub user: String,
}

impl Message {
    /// Create a message.
    pub fn new(text: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user: user.into(),
        }
    }

    /// Decode a message from a JSON text frame.
    pub fn decode(raw: &str) -> Result<Self, RecvError> {
        serde_json::from_str(raw).map_err(RecvError::Malformed)
    }

    /// Decode a message from a JSON binary frame.
    pub fn decode_slice(raw: &[u8]) -> Result<Self, RecvError> {
        serde_json::from_slice(raw).map_err(RecvError::Malformed)
    }

    /// Encode the message as a JSON object.
    pub fn encode(&self) -> Result<String, SendError> {
        serde_json::to_string(self).map_err(SendError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn decode_valid_message() {
        let msg = Message::decode(r#"{"text":"hi","user":"x"}"#).unwrap();
        assert_eq!(msg, Message::new("hi", "x"));
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let msg = Message::decode(r#"{"text":"hi","user":"x","room":"lobby"}"#).unwrap();
        assert_eq!(msg.text, "hi");
        assert_eq!(msg.user, "x");
    }

    #[test]
    fn decode_missing_user_is_malformed() {
        let err = Message::decode(r#"{"text":"hi"}"#).unwrap_err();
        assert_matches!(err, RecvError::Malformed(_));
    }

    #[test]
    fn decode_missing_text_is_malformed() {
        let err = Message::decode(r#"{"user":"x"}"#).unwrap_err();
        assert_matches!(err, RecvError::Malformed(_));
    }

    #[test]
    fn decode_wrong_type_is_malformed() {
        let err = Message::decode(r#"{"text":42,"user":"x"}"#).unwrap_err();
        assert_matches!(err, RecvError::Malformed(_));
    }

    #[test]
    fn decode_garbage_is_malformed() {
        assert_matches!(Message::decode("not json"), Err(RecvError::Malformed(_)));
        assert_matches!(Message::decode(""), Err(RecvError::Malformed(_)));
    }

    #[test]
    fn decode_slice_accepts_binary_json() {
        let msg = Message::decode_slice(br#"{"text":"bin","user":"b"}"#).unwrap();
        assert_eq!(msg, Message::new("bin", "b"));
    }

    #[test]
    fn decode_slice_rejects_invalid_utf8() {
        assert_matches!(
            Message::decode_slice(&[0xff, 0xfe, 0x00]),
            Err(RecvError::Malformed(_))
        );
    }

    #[test]
    fn encode_has_both_fields() {
        let json = Message::new("hello", "alice").encode().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["text"], "hello");
        assert_eq!(parsed["user"], "alice");
        assert_eq!(parsed.as_object().unwrap().len(), 2);
    }

    #[test]
    fn empty_strings_are_valid() {
        let msg = Message::decode(r#"{"text":"","user":""}"#).unwrap();
        assert!(msg.text.is_empty());
        assert!(msg.user.is_empty());
    }

    #[test]
    fn structural_equality() {
        assert_eq!(Message::new("a", "b"), Message::new("a", "b"));
        assert_ne!(Message::new("a", "b"), Message::new("a", "c"));
    }

    mod roundtrip {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn encoded_messages_decode_to_the_same_value(text in ".*", user in ".*") {
                let msg = Message::new(text, user);
                let json = msg.encode().unwrap();
                prop_assert_eq!(Message::decode(&json).unwrap(), msg);
            }
        }
    }
}
