//! Input event types passed between capture, the context engine, the wire,
//! and injection.

use serde::{Deserialize, Serialize};

use crate::domain::geometry::{Direction, NormalizedPoint, Position};

/// Kinds of input and lifecycle events carried on the wire.
///
/// `ScreenEnter` and `ScreenLeave` are legacy: current servers ignore them
/// on receipt, but the tags stay decodable for older peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    MouseMove,
    MouseButtonPress,
    MouseButtonRelease,
    KeyPress,
    KeyRelease,
    ScreenEnter,
    ScreenLeave,
}

/// A mouse event.
///
/// Captured events carry a pixel `position`; wire events carry a
/// `normalized_point` instead. Exactly one of the two must be present when
/// the event is encoded. Button numbering: 1=left, 2=middle, 3=right,
/// 4/5=vertical wheel, 6/7=horizontal wheel, 8/9=side buttons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    pub event_type: EventType,
    pub position: Option<Position>,
    pub normalized_point: Option<NormalizedPoint>,
    pub button: Option<u8>,
}

impl MouseEvent {
    /// A capture-side motion event at a pixel position.
    pub fn motion(position: Position) -> Self {
        Self {
            event_type: EventType::MouseMove,
            position: Some(position),
            normalized_point: None,
            button: None,
        }
    }

    /// A capture-side button press/release at a pixel position.
    pub fn button(event_type: EventType, position: Position, button: u8) -> Self {
        Self {
            event_type,
            position: Some(position),
            normalized_point: None,
            button: Some(button),
        }
    }

    /// A wire-side motion event carrying normalized coordinates (or the
    /// hide signal).
    pub fn motion_normalized(point: NormalizedPoint) -> Self {
        Self {
            event_type: EventType::MouseMove,
            position: None,
            normalized_point: Some(point),
            button: None,
        }
    }

    /// Returns `true` for button press/release events.
    pub fn is_button_event(&self) -> bool {
        matches!(
            self.event_type,
            EventType::MouseButtonPress | EventType::MouseButtonRelease
        )
    }
}

/// A keyboard event.
///
/// `keycode` is the raw code in the capturing side's native space (X11
/// keycode or evdev+8); the injector adapts it. `keysym` is the advisory
/// X11 symbol; `state` is the modifier mask at the time of the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub event_type: EventType,
    pub keycode: u32,
    pub keysym: Option<u32>,
    pub state: Option<u32>,
}

impl KeyEvent {
    /// Creates a key press event.
    pub fn press(keycode: u32, keysym: Option<u32>, state: Option<u32>) -> Self {
        Self {
            event_type: EventType::KeyPress,
            keycode,
            keysym,
            state,
        }
    }

    /// Creates a key release event.
    pub fn release(keycode: u32, keysym: Option<u32>, state: Option<u32>) -> Self {
        Self {
            event_type: EventType::KeyRelease,
            keycode,
            keysym,
            state,
        }
    }

    /// Returns `true` for press events (vs release).
    pub fn is_press(&self) -> bool {
        self.event_type == EventType::KeyPress
    }
}

/// A captured input event of either kind, as drained from the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Mouse(MouseEvent),
    Key(KeyEvent),
}

/// A screen boundary crossing detected by the pointer tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenTransition {
    /// Which edge was crossed.
    pub direction: Direction,
    /// Pointer position at the moment of crossing.
    pub position: Position,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
