//! All tx2tx protocol message types.
//!
//! Messages are self-delimited: one JSON object per `\n`-terminated line,
//! with the envelope `{ "msg_type": <tag>, "payload": { ... } }`. This
//! module holds the typed payloads and builders; line framing and envelope
//! encode/decode live in [`crate::protocol::codec`].

use serde::{Deserialize, Serialize};

use crate::domain::events::{EventType, KeyEvent, MouseEvent, ScreenTransition};
use crate::domain::geometry::{Direction, NormalizedPoint, Position, Screen};
use crate::protocol::codec::ProtocolError;

/// `hello` payload: handshake in both directions. The server sends its
/// version on accept; the client answers with version, local geometry, and
/// its configured name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloPayload {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

/// `screen_info` payload: standalone geometry report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenInfoPayload {
    pub width: i32,
    pub height: i32,
}

/// `screen_enter` / `screen_leave` payload. Legacy: servers log and ignore
/// these on receipt; the builders remain for wire compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPayload {
    pub direction: Direction,
    pub x: i32,
    pub y: i32,
}

/// `mouse_event` payload. Exactly one of the coordinate forms is emitted:
/// normalized `(norm_x, norm_y)` for everything that crosses the wire, or
/// pixel `(x, y)` for legacy peers. Decoding prefers the normalized form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouseEventPayload {
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norm_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norm_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<u8>,
}

impl MouseEventPayload {
    /// Builds the wire payload for a mouse event, preferring normalized
    /// coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingCoordinates`] when the event carries
    /// neither coordinate form.
    pub fn from_event(event: &MouseEvent) -> Result<Self, ProtocolError> {
        if let Some(point) = event.normalized_point {
            Ok(Self {
                event_type: event.event_type,
                norm_x: Some(point.x),
                norm_y: Some(point.y),
                x: None,
                y: None,
                button: event.button,
            })
        } else if let Some(pos) = event.position {
            Ok(Self {
                event_type: event.event_type,
                norm_x: None,
                norm_y: None,
                x: Some(pos.x),
                y: Some(pos.y),
                button: event.button,
            })
        } else {
            Err(ProtocolError::MissingCoordinates)
        }
    }

    /// Parses the payload back into a domain event. The normalized form
    /// wins when both are present.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingCoordinates`] when neither form is
    /// present.
    pub fn into_event(self) -> Result<MouseEvent, ProtocolError> {
        if let (Some(norm_x), Some(norm_y)) = (self.norm_x, self.norm_y) {
            Ok(MouseEvent {
                event_type: self.event_type,
                position: None,
                normalized_point: Some(NormalizedPoint::new(norm_x, norm_y)),
                button: self.button,
            })
        } else if let (Some(x), Some(y)) = (self.x, self.y) {
            Ok(MouseEvent {
                event_type: self.event_type,
                position: Some(Position::new(x, y)),
                normalized_point: None,
                button: self.button,
            })
        } else {
            Err(ProtocolError::MissingCoordinates)
        }
    }
}

/// `key_event` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEventPayload {
    pub event_type: EventType,
    pub keycode: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keysym: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<u32>,
}

impl KeyEventPayload {
    /// Builds the wire payload for a key event.
    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            event_type: event.event_type,
            keycode: event.keycode,
            keysym: event.keysym,
            state: event.state,
        }
    }

    /// Parses the payload back into a domain event.
    pub fn into_event(self) -> KeyEvent {
        KeyEvent {
            event_type: self.event_type,
            keycode: self.keycode,
            keysym: self.keysym,
            state: self.state,
        }
    }
}

/// `hint_show` payload: single-character overlay label with a timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintShowPayload {
    pub label: String,
    pub timeout_ms: u64,
}

/// `error` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

/// All tx2tx protocol messages, discriminated by the envelope tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello(HelloPayload),
    ScreenInfo(ScreenInfoPayload),
    ScreenEnter(TransitionPayload),
    ScreenLeave(TransitionPayload),
    MouseEvent(MouseEventPayload),
    KeyEvent(KeyEventPayload),
    Keepalive,
    HintShow(HintShowPayload),
    HintHide,
    Error(ErrorPayload),
}

impl Message {
    /// Returns the wire tag for this message.
    pub fn msg_type(&self) -> &'static str {
        match self {
            Message::Hello(_) => "hello",
            Message::ScreenInfo(_) => "screen_info",
            Message::ScreenEnter(_) => "screen_enter",
            Message::ScreenLeave(_) => "screen_leave",
            Message::MouseEvent(_) => "mouse_event",
            Message::KeyEvent(_) => "key_event",
            Message::Keepalive => "keepalive",
            Message::HintShow(_) => "hint_show",
            Message::HintHide => "hint_hide",
            Message::Error(_) => "error",
        }
    }

    // ── Builders ──────────────────────────────────────────────────────────────

    /// Handshake message. Geometry and name are included when known.
    pub fn hello(version: &str, screen: Option<Screen>, client_name: Option<&str>) -> Message {
        Message::Hello(HelloPayload {
            version: version.to_string(),
            screen_width: screen.map(|s| s.width()),
            screen_height: screen.map(|s| s.height()),
            client_name: client_name.map(str::to_string),
        })
    }

    /// Standalone geometry report.
    pub fn screen_info(screen: Screen) -> Message {
        Message::ScreenInfo(ScreenInfoPayload {
            width: screen.width(),
            height: screen.height(),
        })
    }

    /// Legacy screen-enter notification.
    pub fn screen_enter(transition: &ScreenTransition) -> Message {
        Message::ScreenEnter(TransitionPayload {
            direction: transition.direction,
            x: transition.position.x,
            y: transition.position.y,
        })
    }

    /// Legacy screen-leave notification.
    pub fn screen_leave(transition: &ScreenTransition) -> Message {
        Message::ScreenLeave(TransitionPayload {
            direction: transition.direction,
            x: transition.position.x,
            y: transition.position.y,
        })
    }

    /// Mouse event carrying exactly one coordinate form.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingCoordinates`] when the event carries
    /// neither pixel nor normalized coordinates.
    pub fn mouse_event(event: &MouseEvent) -> Result<Message, ProtocolError> {
        Ok(Message::MouseEvent(MouseEventPayload::from_event(event)?))
    }

    /// Mouse motion at a normalized point. Also used for the hide signal.
    pub fn mouse_move_normalized(point: NormalizedPoint) -> Message {
        Message::MouseEvent(MouseEventPayload {
            event_type: EventType::MouseMove,
            norm_x: Some(point.x),
            norm_y: Some(point.y),
            x: None,
            y: None,
            button: None,
        })
    }

    /// Key event.
    pub fn key_event(event: &KeyEvent) -> Message {
        Message::KeyEvent(KeyEventPayload::from_event(event))
    }

    /// Liveness probe; either side may send one at any time.
    pub fn keepalive() -> Message {
        Message::Keepalive
    }

    /// Overlay hint request.
    pub fn hint_show(label: &str, timeout_ms: u64) -> Message {
        Message::HintShow(HintShowPayload {
            label: label.to_string(),
            timeout_ms,
        })
    }

    /// Overlay hide request.
    pub fn hint_hide() -> Message {
        Message::HintHide
    }

    /// Error notification.
    pub fn error(error: &str) -> Message {
        Message::Error(ErrorPayload {
            error: error.to_string(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
