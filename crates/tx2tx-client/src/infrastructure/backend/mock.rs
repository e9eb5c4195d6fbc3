//! In-memory display and injection backends for the client.
//!
//! The display tracks cursor visibility against a fixed geometry; the
//! injector records every injected event through a shared handle so tests
//! can assert on exactly what would have reached the platform.

use std::sync::{Arc, Mutex};

use tx2tx_core::backend::{BackendError, DisplayBackend, InputCapturer, InputInjector};
use tx2tx_core::domain::events::{InputEvent, KeyEvent, MouseEvent};
use tx2tx_core::domain::geometry::{Position, Screen};

/// Observable state of the mock client display.
#[derive(Debug)]
pub struct MockClientDisplayState {
    pub screen: Screen,
    pub pointer: Position,
    pub cursor_visible: bool,
    pub connected: bool,
}

/// Mock implementation of [`DisplayBackend`] for the client side.
pub struct MockClientDisplay {
    state: Arc<Mutex<MockClientDisplayState>>,
}

impl MockClientDisplay {
    /// Creates the display and the shared state handle.
    pub fn new(screen: Screen) -> (Self, Arc<Mutex<MockClientDisplayState>>) {
        let state = Arc::new(Mutex::new(MockClientDisplayState {
            screen,
            pointer: Position::new(0, 0),
            cursor_visible: true,
            connected: false,
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockClientDisplayState> {
        self.state.lock().expect("lock poisoned")
    }
}

impl DisplayBackend for MockClientDisplay {
    fn connection_establish(&mut self) -> Result<(), BackendError> {
        self.lock().connected = true;
        Ok(())
    }

    fn connection_close(&mut self) {
        self.lock().connected = false;
    }

    fn connection_sync(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn screen_geometry(&self) -> Result<Screen, BackendError> {
        Ok(self.lock().screen)
    }

    fn pointer_position(&mut self) -> Result<Position, BackendError> {
        Ok(self.lock().pointer)
    }

    fn cursor_position_set(&mut self, position: Position) -> Result<(), BackendError> {
        self.lock().pointer = position;
        Ok(())
    }

    fn pointer_grab(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn pointer_ungrab(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn keyboard_grab(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn keyboard_ungrab(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn cursor_hide(&mut self) -> Result<(), BackendError> {
        self.lock().cursor_visible = false;
        Ok(())
    }

    fn cursor_show(&mut self) -> Result<(), BackendError> {
        self.lock().cursor_visible = true;
        Ok(())
    }

    fn session_is_native(&self) -> bool {
        true
    }
}

/// Injector that records instead of injecting.
pub struct RecordingInjector {
    injected: Arc<Mutex<Vec<InputEvent>>>,
    ready: bool,
    fail_injection: bool,
}

impl RecordingInjector {
    /// Creates the injector and the shared record handle.
    pub fn new() -> (Self, Arc<Mutex<Vec<InputEvent>>>) {
        let injected = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                injected: Arc::clone(&injected),
                ready: true,
                fail_injection: false,
            },
            injected,
        )
    }

    /// Creates an injector that reports itself unavailable.
    pub fn unavailable() -> Self {
        Self {
            injected: Arc::new(Mutex::new(Vec::new())),
            ready: false,
            fail_injection: false,
        }
    }

    /// Makes every injection call fail, for error-path tests.
    pub fn failing() -> Self {
        Self {
            injected: Arc::new(Mutex::new(Vec::new())),
            ready: true,
            fail_injection: true,
        }
    }
}

impl InputInjector for RecordingInjector {
    fn injection_ready(&self) -> bool {
        self.ready
    }

    fn mouse_event_inject(&mut self, event: &MouseEvent) -> Result<(), BackendError> {
        if self.fail_injection {
            return Err(BackendError::Injection("injected mouse failure".to_string()));
        }
        self.injected
            .lock()
            .expect("lock poisoned")
            .push(InputEvent::Mouse(*event));
        Ok(())
    }

    fn key_event_inject(&mut self, event: &KeyEvent) -> Result<(), BackendError> {
        if self.fail_injection {
            return Err(BackendError::Injection("injected key failure".to_string()));
        }
        self.injected
            .lock()
            .expect("lock poisoned")
            .push(InputEvent::Key(*event));
        Ok(())
    }
}

/// Capture is a server-side concern, but the contract is occasionally
/// useful in client tests; drain nothing, report no modifiers.
pub struct NullCapturer;

impl InputCapturer for NullCapturer {
    fn input_events_read(&mut self) -> (Vec<InputEvent>, u32) {
        (Vec::new(), 0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
