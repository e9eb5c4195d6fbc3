//! In-memory display and capture backends.
//!
//! Fully functional against the backend contracts: the display tracks
//! pointer position, grab counts, and cursor visibility, and records every
//! state-changing operation in order so tests can assert on exact
//! sequences (the revert ordering matters). The capturer drains events
//! scripted through its shared handle. The factory exposes the pair as the
//! `mock` backend for headless runs.

use std::sync::{Arc, Mutex};

use tx2tx_core::backend::{BackendError, DisplayBackend, InputCapturer};
use tx2tx_core::domain::events::InputEvent;
use tx2tx_core::domain::geometry::{Position, Screen};

/// Observable state of the mock display, shared with tests via the handle
/// returned by [`MockDisplayBackend::new`].
#[derive(Debug)]
pub struct MockDisplayState {
    pub screen: Screen,
    pub pointer: Position,
    pub cursor_visible: bool,
    pub pointer_grabs: u32,
    pub keyboard_grabs: u32,
    pub native: bool,
    pub connected: bool,
    /// Ordered log of state-changing operations, e.g. `"keyboard_ungrab"`,
    /// `"warp(30, 540)"`. Pointer queries are not recorded (one per tick
    /// would swamp the log).
    pub operations: Vec<String>,
    /// Operation name whose next call should fail (fault injection).
    pub fail_next: Option<&'static str>,
}

/// Mock implementation of [`DisplayBackend`].
pub struct MockDisplayBackend {
    state: Arc<Mutex<MockDisplayState>>,
}

impl MockDisplayBackend {
    /// Creates the backend and the shared state handle.
    pub fn new(screen: Screen) -> (Self, Arc<Mutex<MockDisplayState>>) {
        let state = Arc::new(Mutex::new(MockDisplayState {
            screen,
            pointer: Position::new(screen.width() / 2, screen.height() / 2),
            cursor_visible: true,
            pointer_grabs: 0,
            keyboard_grabs: 0,
            native: true,
            connected: false,
            operations: Vec::new(),
            fail_next: None,
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }

    fn fail_check(
        state: &mut MockDisplayState,
        name: &'static str,
    ) -> Result<(), BackendError> {
        if state.fail_next == Some(name) {
            state.fail_next = None;
            return Err(BackendError::Operation(format!("injected {name} failure")));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockDisplayState> {
        self.state.lock().expect("lock poisoned")
    }
}

impl DisplayBackend for MockDisplayBackend {
    fn connection_establish(&mut self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.operations.push("connect".to_string());
        Self::fail_check(&mut state, "connect")?;
        state.connected = true;
        Ok(())
    }

    fn connection_close(&mut self) {
        let mut state = self.lock();
        state.operations.push("close".to_string());
        state.connected = false;
    }

    fn connection_sync(&mut self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.operations.push("sync".to_string());
        Self::fail_check(&mut state, "sync")
    }

    fn screen_geometry(&self) -> Result<Screen, BackendError> {
        Ok(self.lock().screen)
    }

    fn pointer_position(&mut self) -> Result<Position, BackendError> {
        let mut state = self.lock();
        Self::fail_check(&mut state, "pointer_position")?;
        Ok(state.pointer)
    }

    fn cursor_position_set(&mut self, position: Position) -> Result<(), BackendError> {
        let mut state = self.lock();
        state
            .operations
            .push(format!("warp({}, {})", position.x, position.y));
        Self::fail_check(&mut state, "warp")?;
        state.pointer = position;
        Ok(())
    }

    fn pointer_grab(&mut self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.operations.push("pointer_grab".to_string());
        if state.fail_next == Some("pointer_grab") {
            state.fail_next = None;
            return Err(BackendError::Grab { device: "pointer" });
        }
        state.pointer_grabs += 1;
        Ok(())
    }

    fn pointer_ungrab(&mut self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.operations.push("pointer_ungrab".to_string());
        Self::fail_check(&mut state, "pointer_ungrab")?;
        state.pointer_grabs = state.pointer_grabs.saturating_sub(1);
        Ok(())
    }

    fn keyboard_grab(&mut self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.operations.push("keyboard_grab".to_string());
        if state.fail_next == Some("keyboard_grab") {
            state.fail_next = None;
            return Err(BackendError::Grab { device: "keyboard" });
        }
        state.keyboard_grabs += 1;
        Ok(())
    }

    fn keyboard_ungrab(&mut self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.operations.push("keyboard_ungrab".to_string());
        Self::fail_check(&mut state, "keyboard_ungrab")?;
        state.keyboard_grabs = state.keyboard_grabs.saturating_sub(1);
        Ok(())
    }

    fn cursor_hide(&mut self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.operations.push("cursor_hide".to_string());
        Self::fail_check(&mut state, "cursor_hide")?;
        state.cursor_visible = false;
        Ok(())
    }

    fn cursor_show(&mut self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.operations.push("cursor_show".to_string());
        Self::fail_check(&mut state, "cursor_show")?;
        state.cursor_visible = true;
        Ok(())
    }

    fn session_is_native(&self) -> bool {
        self.lock().native
    }
}

/// Queue handle for scripting captured input from tests.
#[derive(Debug, Default)]
pub struct CapturedInput {
    pub pending: Vec<InputEvent>,
    pub modifier_state: u32,
}

/// Mock implementation of [`InputCapturer`]: drains whatever the test
/// pushed into the shared queue.
pub struct MockInputCapturer {
    queue: Arc<Mutex<CapturedInput>>,
}

impl MockInputCapturer {
    /// Creates the capturer and the shared queue handle.
    pub fn new() -> (Self, Arc<Mutex<CapturedInput>>) {
        let queue = Arc::new(Mutex::new(CapturedInput::default()));
        (
            Self {
                queue: Arc::clone(&queue),
            },
            queue,
        )
    }
}

impl InputCapturer for MockInputCapturer {
    fn input_events_read(&mut self) -> (Vec<InputEvent>, u32) {
        let mut queue = self.queue.lock().expect("lock poisoned");
        (std::mem::take(&mut queue.pending), queue.modifier_state)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
