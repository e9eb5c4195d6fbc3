//! JSON line codec for tx2tx protocol messages.
//!
//! Wire format: one UTF-8 JSON envelope per `\n`-terminated line:
//!
//! ```text
//! {"msg_type": "<tag>", "payload": { ... }}\n
//! ```
//!
//! Decoding is two-step: the raw envelope first, then a tag-dispatched
//! typed payload. Unknown tags surface as
//! [`ProtocolError::UnknownMessageType`] so receivers can log and drop them
//! (forward compatibility) instead of killing the connection.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::protocol::messages::Message;

/// Maximum bytes a peer may accumulate in its line buffer (1 MiB).
/// Exceeding it is a fatal error for that peer only.
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Errors that can occur during message encoding, decoding, or framing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The line is not a valid JSON envelope.
    #[error("invalid message frame: {0}")]
    InvalidFrame(#[source] serde_json::Error),

    /// The envelope tag is not a known message type.
    #[error("unknown message type {0:?}")]
    UnknownMessageType(String),

    /// The payload does not match the schema for its tag.
    #[error("malformed {msg_type} payload: {source}")]
    MalformedPayload {
        msg_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A mouse event carried neither normalized nor pixel coordinates.
    #[error("mouse event must carry either (norm_x, norm_y) or (x, y)")]
    MissingCoordinates,

    /// A peer's line buffer exceeded its cap.
    #[error("line buffer exceeded {limit} bytes")]
    BufferOverflow { limit: usize },

    /// The message could not be serialized.
    #[error("failed to serialize message: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    msg_type: String,
    payload: Value,
}

/// Encodes a message as one newline-terminated JSON line.
///
/// # Errors
///
/// Returns [`ProtocolError::Serialize`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use tx2tx_core::protocol::codec::{decode_line, encode_line};
/// use tx2tx_core::protocol::messages::Message;
///
/// let line = encode_line(&Message::keepalive()).unwrap();
/// assert!(line.ends_with('\n'));
/// let decoded = decode_line(line.trim_end()).unwrap();
/// assert_eq!(decoded, Message::keepalive());
/// ```
pub fn encode_line(message: &Message) -> Result<String, ProtocolError> {
    let payload = match message {
        Message::Hello(p) => to_value(p)?,
        Message::ScreenInfo(p) => to_value(p)?,
        Message::ScreenEnter(p) => to_value(p)?,
        Message::ScreenLeave(p) => to_value(p)?,
        Message::MouseEvent(p) => to_value(p)?,
        Message::KeyEvent(p) => to_value(p)?,
        Message::HintShow(p) => to_value(p)?,
        Message::Error(p) => to_value(p)?,
        Message::Keepalive | Message::HintHide => Value::Object(Default::default()),
    };
    let envelope = Envelope {
        msg_type: message.msg_type().to_string(),
        payload,
    };
    let mut line = serde_json::to_string(&envelope).map_err(ProtocolError::Serialize)?;
    line.push('\n');
    Ok(line)
}

/// Decodes one line (without its trailing newline) into a message.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidFrame`] for non-JSON input,
/// [`ProtocolError::UnknownMessageType`] for unrecognized tags, and
/// [`ProtocolError::MalformedPayload`] / [`ProtocolError::MissingCoordinates`]
/// for schema violations.
pub fn decode_line(line: &str) -> Result<Message, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(line).map_err(ProtocolError::InvalidFrame)?;
    decode_payload(&envelope.msg_type, envelope.payload)
}

fn to_value<T: Serialize>(payload: &T) -> Result<Value, ProtocolError> {
    serde_json::to_value(payload).map_err(ProtocolError::Serialize)
}

fn parse_payload<T: DeserializeOwned>(
    msg_type: &'static str,
    payload: Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::MalformedPayload {
        msg_type,
        source,
    })
}

fn decode_payload(tag: &str, payload: Value) -> Result<Message, ProtocolError> {
    match tag {
        "hello" => Ok(Message::Hello(parse_payload("hello", payload)?)),
        "screen_info" => Ok(Message::ScreenInfo(parse_payload("screen_info", payload)?)),
        "screen_enter" => Ok(Message::ScreenEnter(parse_payload("screen_enter", payload)?)),
        "screen_leave" => Ok(Message::ScreenLeave(parse_payload("screen_leave", payload)?)),
        "mouse_event" => {
            let parsed: crate::protocol::messages::MouseEventPayload =
                parse_payload("mouse_event", payload)?;
            let has_normalized = parsed.norm_x.is_some() && parsed.norm_y.is_some();
            let has_pixel = parsed.x.is_some() && parsed.y.is_some();
            if !has_normalized && !has_pixel {
                return Err(ProtocolError::MissingCoordinates);
            }
            Ok(Message::MouseEvent(parsed))
        }
        "key_event" => Ok(Message::KeyEvent(parse_payload("key_event", payload)?)),
        "keepalive" => Ok(Message::Keepalive),
        "hint_show" => Ok(Message::HintShow(parse_payload("hint_show", payload)?)),
        "hint_hide" => Ok(Message::HintHide),
        "error" => Ok(Message::Error(parse_payload("error", payload)?)),
        other => Err(ProtocolError::UnknownMessageType(other.to_string())),
    }
}

// ── Line framing ──────────────────────────────────────────────────────────────

/// Bounded `\n`-delimited line assembler shared by both network layers.
///
/// Received bytes append until the cap; complete lines drain out for
/// decoding. Overflow is reported so the caller can close that peer.
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    limit: usize,
}

impl LineFramer {
    /// Creates a framer with an explicit byte cap.
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
        }
    }

    /// Creates a framer with the protocol default cap of
    /// [`MAX_BUFFER_SIZE`].
    pub fn with_default_limit() -> Self {
        Self::new(MAX_BUFFER_SIZE)
    }

    /// Appends received bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BufferOverflow`] when the buffered bytes
    /// would exceed the cap; the caller must treat this as fatal for the
    /// peer.
    pub fn push(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        if self.buffer.len() + data.len() > self.limit {
            return Err(ProtocolError::BufferOverflow { limit: self.limit });
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Drains all complete lines, skipping blank ones. Any trailing partial
    /// line stays buffered for the next read.
    pub fn take_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(newline_idx) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline_idx).collect();
            let text = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        lines
    }

    /// Bytes currently buffered (partial line).
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::EventType;
    use crate::domain::geometry::NormalizedPoint;

    #[test]
    fn test_encode_produces_envelope_with_tag_and_payload() {
        let line = encode_line(&Message::error("nope")).unwrap();
        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["msg_type"], "error");
        assert_eq!(value["payload"]["error"], "nope");
    }

    #[test]
    fn test_keepalive_encodes_empty_payload_object() {
        let line = encode_line(&Message::keepalive()).unwrap();
        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert!(value["payload"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_decode_unknown_tag_is_a_structured_error() {
        let result = decode_line(r#"{"msg_type": "clipboard_sync", "payload": {}}"#);
        assert!(matches!(
            result,
            Err(ProtocolError::UnknownMessageType(tag)) if tag == "clipboard_sync"
        ));
    }

    #[test]
    fn test_decode_rejects_non_json_line() {
        assert!(matches!(
            decode_line("not json at all"),
            Err(ProtocolError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_decode_mouse_event_without_coordinates_fails() {
        let result = decode_line(r#"{"msg_type": "mouse_event", "payload": {"event_type": "mouse_move"}}"#);
        assert!(matches!(result, Err(ProtocolError::MissingCoordinates)));
    }

    #[test]
    fn test_decode_mouse_event_with_pixel_coordinates() {
        let msg =
            decode_line(r#"{"msg_type": "mouse_event", "payload": {"event_type": "mouse_button_press", "x": 10, "y": 20, "button": 1}}"#)
                .unwrap();
        if let Message::MouseEvent(payload) = msg {
            assert_eq!(payload.event_type, EventType::MouseButtonPress);
            assert_eq!((payload.x, payload.y, payload.button), (Some(10), Some(20), Some(1)));
        } else {
            panic!("unexpected variant");
        }
    }

    #[test]
    fn test_hide_signal_round_trips() {
        let msg = Message::mouse_move_normalized(NormalizedPoint::HIDE_SIGNAL);
        let line = encode_line(&msg).unwrap();
        let decoded = decode_line(line.trim_end()).unwrap();
        if let Message::MouseEvent(payload) = decoded {
            assert_eq!(payload.norm_x, Some(-1.0));
            assert_eq!(payload.norm_y, Some(-1.0));
        } else {
            panic!("unexpected variant");
        }
    }

    // ── LineFramer ────────────────────────────────────────────────────────────

    #[test]
    fn test_framer_reassembles_split_lines() {
        let mut framer = LineFramer::with_default_limit();
        framer.push(b"{\"msg_type\": \"keepal").unwrap();
        assert!(framer.take_lines().is_empty());
        framer.push(b"ive\", \"payload\": {}}\n").unwrap();
        let lines = framer.take_lines();
        assert_eq!(lines.len(), 1);
        assert!(decode_line(&lines[0]).is_ok());
    }

    #[test]
    fn test_framer_drains_multiple_lines_and_keeps_remainder() {
        let mut framer = LineFramer::with_default_limit();
        framer.push(b"one\ntwo\nthr").unwrap();
        assert_eq!(framer.take_lines(), vec!["one".to_string(), "two".to_string()]);
        assert_eq!(framer.buffered_len(), 3);
    }

    #[test]
    fn test_framer_skips_blank_lines() {
        let mut framer = LineFramer::with_default_limit();
        framer.push(b"\n  \nactual\n").unwrap();
        assert_eq!(framer.take_lines(), vec!["actual".to_string()]);
    }

    #[test]
    fn test_framer_overflow_is_fatal_for_the_buffer() {
        let mut framer = LineFramer::new(8);
        framer.push(b"12345").unwrap();
        assert!(matches!(
            framer.push(b"67890"),
            Err(ProtocolError::BufferOverflow { limit: 8 })
        ));
    }
}
