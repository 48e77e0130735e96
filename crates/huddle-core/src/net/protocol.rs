use serde_json::Value;

use super::messages::{Message, MessageType};

/// Maximum encoded message size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    EmptyMessage,
    PayloadTooLarge(usize),
    /// Not well-formed JSON, or not a JSON object.
    Malformed(String),
    /// No `"type"` field, or one that is not a string.
    MissingType,
    UnknownMessageType(String),
    /// Known type, but required fields are missing or mistyped.
    InvalidPayload {
        kind: MessageType,
        reason: String,
    },
    SerializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::Malformed(e) => write!(f, "malformed message: {e}"),
            Self::MissingType => write!(f, "missing \"type\" field"),
            Self::UnknownMessageType(t) => write!(f, "unknown message type: {t:?}"),
            Self::InvalidPayload { kind, reason } => {
                write!(f, "invalid {kind} message: {reason}")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a message as a single JSON object.
pub fn encode_message(msg: &Message) -> Result<String, ProtocolError> {
    let text =
        serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(text.len()));
    }
    Ok(text)
}

/// Parse the raw frame into a JSON object and resolve its `"type"` tag.
fn parse_tagged(data: &[u8]) -> Result<(MessageType, Value), ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }

    let value: Value =
        serde_json::from_slice(data).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let Some(object) = value.as_object() else {
        return Err(ProtocolError::Malformed("expected a JSON object".to_string()));
    };

    let tag = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    let kind = MessageType::from_tag(tag)
        .ok_or_else(|| ProtocolError::UnknownMessageType(tag.to_string()))?;

    Ok((kind, value))
}

/// Extract only the message type from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    parse_tagged(data).map(|(kind, _)| kind)
}

/// Decode raw wire data into a `Message`.
pub fn decode_message(data: &[u8]) -> Result<Message, ProtocolError> {
    let (kind, value) = parse_tagged(data)?;
    serde_json::from_value(value).map_err(|e| ProtocolError::InvalidPayload {
        kind,
        reason: e.to_string(),
    })
}
