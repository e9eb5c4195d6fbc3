//! Platform backend contracts consumed by the server engine and the client
//! receive/inject loop.
//!
//! Concrete X11 and Wayland-helper implementations live outside this crate
//! and plug in through these traits. The application crates ship in-memory
//! implementations (`infrastructure::backend::mock`) used by tests and
//! headless runs, which keeps every piece of context-switching policy
//! exercisable without a display server.

use thiserror::Error;

use crate::domain::events::{InputEvent, KeyEvent, MouseEvent};
use crate::domain::geometry::{Position, Screen};

/// Errors surfaced by platform backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The display backend could not be reached.
    #[error("display backend connection failed: {0}")]
    Connect(String),

    /// No backend with this name is compiled into this build.
    #[error("unsupported backend {0:?}")]
    Unsupported(String),

    /// The platform refused a pointer or keyboard grab.
    #[error("failed to grab {device}")]
    Grab { device: &'static str },

    /// A display operation (query, warp, cursor, sync) failed.
    #[error("display operation failed: {0}")]
    Operation(String),

    /// The platform injector rejected an event.
    #[error("input injection failed: {0}")]
    Injection(String),
}

/// Display capabilities required by the core.
pub trait DisplayBackend {
    /// Opens the connection to the display server or helper.
    fn connection_establish(&mut self) -> Result<(), BackendError>;

    /// Closes the connection. Safe to call more than once.
    fn connection_close(&mut self);

    /// Flushes pending requests so the display observes prior operations.
    fn connection_sync(&mut self) -> Result<(), BackendError>;

    /// Root screen geometry.
    fn screen_geometry(&self) -> Result<Screen, BackendError>;

    /// Current pointer position in root coordinates.
    fn pointer_position(&mut self) -> Result<Position, BackendError>;

    /// Warps the cursor to an absolute position.
    fn cursor_position_set(&mut self, position: Position) -> Result<(), BackendError>;

    fn pointer_grab(&mut self) -> Result<(), BackendError>;
    fn pointer_ungrab(&mut self) -> Result<(), BackendError>;
    fn keyboard_grab(&mut self) -> Result<(), BackendError>;
    fn keyboard_ungrab(&mut self) -> Result<(), BackendError>;

    fn cursor_hide(&mut self) -> Result<(), BackendError>;
    fn cursor_show(&mut self) -> Result<(), BackendError>;

    /// `true` when the session owns the hardware pointer directly. Helper-
    /// mediated sessions return `false` and get warp enforcement for a
    /// short window after each context entry, because their compositors can
    /// drag a freshly warped pointer back toward the crossing edge.
    fn session_is_native(&self) -> bool;
}

/// Non-blocking drain of pending input events plus the current modifier
/// mask.
pub trait InputCapturer {
    fn input_events_read(&mut self) -> (Vec<InputEvent>, u32);
}

/// Client-side synthetic input injection.
pub trait InputInjector {
    /// `true` when the platform can accept synthetic input. Checked once at
    /// startup; a client without injection capability is useless.
    fn injection_ready(&self) -> bool;

    /// Injects a mouse move or button event at its pixel position. When the
    /// platform supports it, the injector focuses the window under the
    /// pointer first so clicks and keys land where the user is looking.
    fn mouse_event_inject(&mut self, event: &MouseEvent) -> Result<(), BackendError>;

    /// Injects a key press or release.
    fn key_event_inject(&mut self, event: &KeyEvent) -> Result<(), BackendError>;
}

// Boxed backends delegate, so factories can hand out `Box<dyn ...>` while
// the consumers stay generic.

impl<T: DisplayBackend + ?Sized> DisplayBackend for Box<T> {
    fn connection_establish(&mut self) -> Result<(), BackendError> {
        (**self).connection_establish()
    }
    fn connection_close(&mut self) {
        (**self).connection_close()
    }
    fn connection_sync(&mut self) -> Result<(), BackendError> {
        (**self).connection_sync()
    }
    fn screen_geometry(&self) -> Result<Screen, BackendError> {
        (**self).screen_geometry()
    }
    fn pointer_position(&mut self) -> Result<Position, BackendError> {
        (**self).pointer_position()
    }
    fn cursor_position_set(&mut self, position: Position) -> Result<(), BackendError> {
        (**self).cursor_position_set(position)
    }
    fn pointer_grab(&mut self) -> Result<(), BackendError> {
        (**self).pointer_grab()
    }
    fn pointer_ungrab(&mut self) -> Result<(), BackendError> {
        (**self).pointer_ungrab()
    }
    fn keyboard_grab(&mut self) -> Result<(), BackendError> {
        (**self).keyboard_grab()
    }
    fn keyboard_ungrab(&mut self) -> Result<(), BackendError> {
        (**self).keyboard_ungrab()
    }
    fn cursor_hide(&mut self) -> Result<(), BackendError> {
        (**self).cursor_hide()
    }
    fn cursor_show(&mut self) -> Result<(), BackendError> {
        (**self).cursor_show()
    }
    fn session_is_native(&self) -> bool {
        (**self).session_is_native()
    }
}

impl<T: InputCapturer + ?Sized> InputCapturer for Box<T> {
    fn input_events_read(&mut self) -> (Vec<InputEvent>, u32) {
        (**self).input_events_read()
    }
}

impl<T: InputInjector + ?Sized> InputInjector for Box<T> {
    fn injection_ready(&self) -> bool {
        (**self).injection_ready()
    }
    fn mouse_event_inject(&mut self, event: &MouseEvent) -> Result<(), BackendError> {
        (**self).mouse_event_inject(event)
    }
    fn key_event_inject(&mut self, event: &KeyEvent) -> Result<(), BackendError> {
        (**self).key_event_inject(event)
    }
}
