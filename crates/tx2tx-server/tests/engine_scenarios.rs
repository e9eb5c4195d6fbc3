//! End-to-end scenarios for the context engine.
//!
//! These tests drive the engine through its public API with the in-memory
//! display/capture backends and a recording transport, covering the full
//! edge-entry / motion-forwarding / return / jump / panic lifecycle and the
//! state invariants that must hold between ticks:
//!
//! - in CENTER: no grabs held, cursor visible;
//! - in a REMOTE context: both grabs held, cursor hidden, and the active
//!   client name resolving to a live connection.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tx2tx_core::config;
use tx2tx_core::domain::events::{EventType, InputEvent, KeyEvent};
use tx2tx_core::domain::geometry::{Position, Screen, ScreenContext};
use tx2tx_core::protocol::messages::Message;
use tx2tx_server::application::context_engine::{ClientTransport, ContextEngine, EngineConfig};
use tx2tx_server::application::jump_hotkey::JumpHotkey;
use tx2tx_server::infrastructure::backend::mock::{
    CapturedInput, MockDisplayBackend, MockDisplayState, MockInputCapturer,
};

// ── Test doubles ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingTransport {
    connected: Vec<String>,
    sent: Vec<(String, Message)>,
    fail_sends: bool,
}

impl RecordingTransport {
    fn mouse_payloads(&self, client: &str) -> Vec<tx2tx_core::protocol::messages::MouseEventPayload> {
        self.sent
            .iter()
            .filter(|(name, _)| name == client)
            .filter_map(|(_, message)| match message {
                Message::MouseEvent(payload) => Some(*payload),
                _ => None,
            })
            .collect()
    }

    fn key_event_count(&self) -> usize {
        self.sent
            .iter()
            .filter(|(_, message)| matches!(message, Message::KeyEvent(_)))
            .count()
    }
}

impl ClientTransport for RecordingTransport {
    fn message_to_client_send(&mut self, name: &str, message: &Message) -> bool {
        if self.fail_sends || !self.connected.iter().any(|n| n == name) {
            return false;
        }
        self.sent.push((name.to_string(), message.clone()));
        true
    }

    fn client_connected_check(&self, name: &str) -> bool {
        self.connected.iter().any(|n| n == name)
    }

    fn client_names(&self) -> Vec<String> {
        self.connected.clone()
    }
}

// ── Harness ───────────────────────────────────────────────────────────────────

struct Harness {
    engine: ContextEngine<MockDisplayBackend, MockInputCapturer>,
    display: Arc<Mutex<MockDisplayState>>,
    input: Arc<Mutex<CapturedInput>>,
    transport: RecordingTransport,
    start: Instant,
}

impl Harness {
    /// Local screen 1920x1080, clients "penguin" (west) and "gazelle"
    /// (east), velocity threshold 100 px/s, panic key Scroll_Lock.
    fn new(jump_enabled: bool) -> Self {
        let screen = Screen::new(1920, 1080);
        let (display, display_state) = MockDisplayBackend::new(screen);
        let (capturer, input) = MockInputCapturer::new();

        let mut context_to_client = HashMap::new();
        context_to_client.insert(ScreenContext::West, "penguin".to_string());
        context_to_client.insert(ScreenContext::East, "gazelle".to_string());

        let jump_cfg = config::JumpHotkeyConfig {
            enabled: jump_enabled,
            ..config::JumpHotkeyConfig::default()
        };
        let engine_config = EngineConfig {
            velocity_threshold: 100.0,
            edge_threshold: 0,
            context_to_client,
            panic_keysyms: HashSet::from([0xFF14]),
            panic_modifier_mask: 0,
            jump_hotkey: JumpHotkey::from_config(&jump_cfg),
        };
        let engine = ContextEngine::new(display, capturer, screen, engine_config);
        let transport = RecordingTransport {
            connected: vec!["penguin".to_string(), "gazelle".to_string()],
            ..RecordingTransport::default()
        };

        Self {
            engine,
            display: display_state,
            input,
            transport,
            start: Instant::now(),
        }
    }

    fn at(&self, secs: f64) -> Instant {
        self.start + Duration::from_secs_f64(secs)
    }

    fn tick_at(&mut self, x: i32, y: i32, secs: f64) {
        self.display.lock().unwrap().pointer = Position::new(x, y);
        let now = self.at(secs);
        self.engine.tick(&mut self.transport, now);
    }

    fn queue_key_press(&self, keysym: u32, state: u32) {
        self.input
            .lock()
            .unwrap()
            .pending
            .push(InputEvent::Key(KeyEvent::press(0, Some(keysym), Some(state))));
    }

    fn queue_key_release(&self, keysym: u32, state: u32) {
        self.input
            .lock()
            .unwrap()
            .pending
            .push(InputEvent::Key(KeyEvent::release(0, Some(keysym), Some(state))));
    }

    /// Drives the S1 flick into the left edge; ends in WEST at t=0.20.
    fn enter_west(&mut self) {
        self.tick_at(400, 540, 0.0);
        self.tick_at(200, 540, 0.05);
        self.tick_at(0, 540, 0.09);
        self.tick_at(0, 540, 0.11);
        assert_eq!(
            self.engine.context(),
            ScreenContext::Center,
            "dwell not yet satisfied at t=0.11"
        );
        self.tick_at(0, 540, 0.20);
        assert_eq!(self.engine.context(), ScreenContext::West);
    }

    /// Mirror flick into the right edge; ends in EAST at t=0.20.
    fn enter_east(&mut self) {
        self.tick_at(1500, 540, 0.0);
        self.tick_at(1700, 540, 0.05);
        self.tick_at(1919, 540, 0.09);
        self.tick_at(1919, 540, 0.11);
        self.tick_at(1919, 540, 0.20);
        assert_eq!(self.engine.context(), ScreenContext::East);
    }

    /// State invariants that must hold between ticks.
    fn assert_invariants(&self) {
        let display = self.display.lock().unwrap();
        if self.engine.context() == ScreenContext::Center {
            assert_eq!(display.pointer_grabs, 0, "no grabs held in CENTER");
            assert_eq!(display.keyboard_grabs, 0, "no grabs held in CENTER");
            assert!(display.cursor_visible, "cursor visible in CENTER");
        } else {
            assert!(display.pointer_grabs >= 1, "pointer grab held in REMOTE");
            assert!(display.keyboard_grabs >= 1, "keyboard grab held in REMOTE");
            assert!(!display.cursor_visible, "cursor hidden in REMOTE");
            let target = self
                .engine
                .state()
                .active_remote_client
                .clone()
                .expect("REMOTE context names an active client");
            assert!(
                self.transport.connected.contains(&target),
                "active client resolves to a live connection"
            );
        }
    }
}

// ── S1: edge entry ────────────────────────────────────────────────────────────

#[test]
fn test_s1_edge_entry_with_velocity_confirmation_and_dwell() {
    let mut h = Harness::new(false);
    h.enter_west();

    let display = h.display.lock().unwrap();
    assert_eq!(display.pointer, Position::new(1890, 540), "parked off the opposite edge");
    assert_eq!(display.pointer_grabs, 1);
    assert_eq!(display.keyboard_grabs, 1);
    assert!(!display.cursor_visible);
    drop(display);

    assert!(h.transport.sent.is_empty(), "entry itself emits no message");
    assert_eq!(h.engine.state().last_sent_position, None);
    assert_eq!(
        h.engine.state().active_remote_client.as_deref(),
        Some("penguin")
    );
    h.assert_invariants();
}

#[test]
fn test_slow_approach_to_the_edge_does_not_transition() {
    let mut h = Harness::new(false);
    // Crawl: 2 px over a second, well under the 100 px/s threshold.
    h.tick_at(2, 540, 0.0);
    h.tick_at(1, 540, 0.4);
    h.tick_at(0, 540, 0.8);
    h.tick_at(0, 540, 1.2);
    h.tick_at(0, 540, 1.6);
    assert_eq!(h.engine.context(), ScreenContext::Center);
    h.assert_invariants();
}

#[test]
fn test_transition_to_unmapped_edge_is_ignored() {
    let mut h = Harness::new(false);
    // Fast flick into the top edge; no client is configured for NORTH.
    h.tick_at(960, 400, 0.0);
    h.tick_at(960, 200, 0.05);
    h.tick_at(960, 0, 0.09);
    h.tick_at(960, 0, 0.11);
    h.tick_at(960, 0, 0.20);
    assert_eq!(h.engine.context(), ScreenContext::Center);
    h.assert_invariants();
}

// ── S2: motion forwarding ─────────────────────────────────────────────────────

#[test]
fn test_s2_motion_forwards_normalized_coordinates() {
    let mut h = Harness::new(false);
    h.enter_west();

    h.tick_at(1800, 540, 0.30);
    let moves = h.transport.mouse_payloads("penguin");
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].event_type, EventType::MouseMove);
    assert_eq!(moves[0].norm_x, Some(0.9375));
    assert_eq!(moves[0].norm_y, Some(0.5));
    assert_eq!(moves[0].x, None, "wire motion never carries pixels");
    h.assert_invariants();
}

#[test]
fn test_unchanged_position_is_not_resent() {
    let mut h = Harness::new(false);
    h.enter_west();

    h.tick_at(1800, 540, 0.30);
    h.tick_at(1800, 540, 0.32);
    h.tick_at(1800, 540, 0.34);
    assert_eq!(h.transport.mouse_payloads("penguin").len(), 1);

    h.tick_at(1801, 540, 0.36);
    assert_eq!(h.transport.mouse_payloads("penguin").len(), 2, "any pixel delta re-emits");
}

#[test]
fn test_button_events_forward_with_normalized_position_and_button() {
    let mut h = Harness::new(false);
    h.enter_west();

    {
        let mut input = h.input.lock().unwrap();
        input.pending.push(InputEvent::Mouse(
            tx2tx_core::domain::events::MouseEvent::button(
                EventType::MouseButtonPress,
                Position::new(960, 540),
                3,
            ),
        ));
    }
    h.tick_at(960, 540, 0.30);

    let payloads = h.transport.mouse_payloads("penguin");
    let button = payloads
        .iter()
        .find(|p| p.event_type == EventType::MouseButtonPress)
        .expect("button event forwarded");
    assert_eq!(button.button, Some(3));
    assert_eq!(button.norm_x, Some(0.5));
    assert_eq!(button.norm_y, Some(0.5));
}

#[test]
fn test_key_events_forward_with_keycode_keysym_and_state() {
    let mut h = Harness::new(false);
    h.enter_west();

    {
        let mut input = h.input.lock().unwrap();
        input.pending.push(InputEvent::Key(KeyEvent::press(38, Some(0x61), Some(0x1))));
    }
    h.tick_at(1890, 540, 0.30);

    let key = h
        .transport
        .sent
        .iter()
        .find_map(|(_, message)| match message {
            Message::KeyEvent(payload) => Some(*payload),
            _ => None,
        })
        .expect("key event forwarded");
    assert_eq!(key.keycode, 38);
    assert_eq!(key.keysym, Some(0x61));
    assert_eq!(key.state, Some(0x1));
}

// ── S3: hide signal and return ────────────────────────────────────────────────

#[test]
fn test_s3_return_sends_hide_signal_then_reverts() {
    let mut h = Harness::new(false);
    h.enter_west();

    h.tick_at(1800, 540, 1.00);
    h.tick_at(1919, 540, 1.05);

    assert_eq!(h.engine.context(), ScreenContext::Center);
    let (last_client, last_message) = h.transport.sent.last().expect("hide signal sent");
    assert_eq!(last_client, "penguin");
    assert!(matches!(
        last_message,
        Message::MouseEvent(p) if p.norm_x == Some(-1.0) && p.norm_y == Some(-1.0)
    ));

    let display = h.display.lock().unwrap();
    assert_eq!(display.pointer, Position::new(30, 540), "cursor back 30px inside the exit edge");
    assert!(display.cursor_visible);
    assert_eq!(display.pointer_grabs, 0);
    assert_eq!(display.keyboard_grabs, 0);
    drop(display);
    h.assert_invariants();
}

#[test]
fn test_return_guard_blocks_early_return_then_releases() {
    let mut h = Harness::new(false);
    h.enter_west();

    // High velocity into the return edge, but only 0.1 s after entry.
    h.tick_at(1500, 540, 0.25);
    h.tick_at(1919, 540, 0.30);
    assert_eq!(h.engine.context(), ScreenContext::West, "return guard holds");

    // Same edge once the guard has elapsed.
    h.tick_at(1919, 540, 0.85);
    assert_eq!(h.engine.context(), ScreenContext::Center);
    h.assert_invariants();
}

#[test]
fn test_return_requires_half_the_velocity_threshold() {
    let mut h = Harness::new(false);
    h.enter_west();

    // Sit still on the return edge: velocity decays to ~0, under 50 px/s.
    h.tick_at(1919, 540, 1.00);
    h.tick_at(1919, 540, 2.00);
    h.tick_at(1919, 540, 3.00);
    assert_eq!(h.engine.context(), ScreenContext::West, "no drift-through return");
}

#[test]
fn test_motion_still_forwards_inside_the_return_guard_window() {
    let mut h = Harness::new(false);
    h.enter_west();

    h.tick_at(1700, 540, 0.25);
    assert_eq!(
        h.transport.mouse_payloads("penguin").len(),
        1,
        "guard blocks returns, not motion"
    );
    assert_eq!(h.engine.context(), ScreenContext::West);
}

// ── S4: jump hotkey ───────────────────────────────────────────────────────────

#[test]
fn test_s4_jump_sequence_enters_west_with_center_parking() {
    let mut h = Harness::new(true);

    h.queue_key_press(0x2F, 0x4); // Ctrl+/
    h.tick_at(960, 540, 0.00);
    assert_eq!(h.engine.context(), ScreenContext::Center);

    h.queue_key_press(0x31, 0x0); // '1'
    h.tick_at(960, 540, 0.01);
    h.queue_key_release(0x31, 0x0);
    h.tick_at(960, 540, 0.02);

    assert_eq!(h.engine.context(), ScreenContext::West);
    let display = h.display.lock().unwrap();
    assert_eq!(
        display.pointer,
        Position::new(960, 540),
        "jump parks at the screen center, not the opposite edge"
    );
    assert_eq!(display.pointer_grabs, 1);
    assert!(!display.cursor_visible);
    drop(display);
    h.assert_invariants();
}

#[test]
fn test_jump_between_remote_contexts_passes_through_a_revert() {
    let mut h = Harness::new(true);

    // Jump into WEST first.
    h.queue_key_press(0x2F, 0x4);
    h.tick_at(960, 540, 0.00);
    h.queue_key_press(0x31, 0x0);
    h.tick_at(960, 540, 0.01);
    h.queue_key_release(0x31, 0x0);
    h.tick_at(960, 540, 0.02);
    assert_eq!(h.engine.context(), ScreenContext::West);

    // Now Ctrl+/ 2 jumps to EAST: the old client gets a hide signal from
    // the intermediate revert, then EAST is entered with center parking.
    h.queue_key_press(0x2F, 0x4);
    h.tick_at(960, 540, 1.00);
    h.queue_key_press(0x32, 0x0);
    h.tick_at(960, 540, 1.01);
    h.queue_key_release(0x32, 0x0);
    h.tick_at(960, 540, 1.02);

    assert_eq!(h.engine.context(), ScreenContext::East);
    assert_eq!(
        h.engine.state().active_remote_client.as_deref(),
        Some("gazelle")
    );
    let hides_to_penguin = h
        .transport
        .mouse_payloads("penguin")
        .iter()
        .filter(|p| p.norm_x == Some(-1.0))
        .count();
    assert_eq!(hides_to_penguin, 1, "old client is told to hide its cursor");
    h.assert_invariants();
}

#[test]
fn test_jump_to_center_from_remote_reverts() {
    let mut h = Harness::new(true);
    h.queue_key_press(0x2F, 0x4);
    h.tick_at(960, 540, 0.00);
    h.queue_key_press(0x31, 0x0);
    h.tick_at(960, 540, 0.01);
    h.queue_key_release(0x31, 0x0);
    h.tick_at(960, 540, 0.02);
    assert_eq!(h.engine.context(), ScreenContext::West);

    h.queue_key_press(0x2F, 0x4);
    h.tick_at(960, 540, 1.00);
    h.queue_key_press(0x30, 0x0); // '0' -> center
    h.tick_at(960, 540, 1.01);
    h.queue_key_release(0x30, 0x0);
    h.tick_at(960, 540, 1.02);

    assert_eq!(h.engine.context(), ScreenContext::Center);
    h.assert_invariants();
}

// ── S5: panic key ─────────────────────────────────────────────────────────────

#[test]
fn test_s5_panic_key_reverts_without_forwarding_the_key() {
    let mut h = Harness::new(false);
    h.enter_east();

    h.queue_key_press(0xFF14, 0x0); // Scroll_Lock
    h.tick_at(100, 540, 0.30);

    assert_eq!(h.engine.context(), ScreenContext::Center);
    assert_eq!(h.transport.key_event_count(), 0, "panic key is never forwarded");
    let display = h.display.lock().unwrap();
    assert!(display.cursor_visible);
    assert_eq!(display.pointer, Position::new(1890, 540), "entry 30px inside the east exit edge");
    drop(display);
    h.assert_invariants();
}

// ── Failure handling ──────────────────────────────────────────────────────────

#[test]
fn test_send_failure_reverts_to_center() {
    let mut h = Harness::new(false);
    h.enter_west();

    h.transport.fail_sends = true;
    h.tick_at(1800, 540, 1.00);

    assert_eq!(h.engine.context(), ScreenContext::Center);
    h.assert_invariants();
}

#[test]
fn test_active_client_disconnect_reverts_on_next_tick() {
    let mut h = Harness::new(false);
    h.enter_west();

    h.transport.connected.clear();
    h.tick_at(1800, 540, 1.00);

    assert_eq!(h.engine.context(), ScreenContext::Center);
    let display = h.display.lock().unwrap();
    assert_eq!(display.pointer_grabs, 0);
    assert!(display.cursor_visible);
}

#[test]
fn test_failed_transition_rolls_back_cleanly() {
    let mut h = Harness::new(false);
    h.display.lock().unwrap().fail_next = Some("cursor_hide");

    h.tick_at(400, 540, 0.0);
    h.tick_at(200, 540, 0.05);
    h.tick_at(0, 540, 0.09);
    h.tick_at(0, 540, 0.11);
    h.tick_at(0, 540, 0.20);

    assert_eq!(h.engine.context(), ScreenContext::Center);
    assert_eq!(h.engine.state().active_remote_client, None);
    h.assert_invariants();
}

// ── Warp enforcement ──────────────────────────────────────────────────────────

#[test]
fn test_non_native_session_enforces_parking_warp_after_entry() {
    let mut h = Harness::new(false);
    h.display.lock().unwrap().native = false;
    h.enter_west();

    // 0.05 s after entry the compositor has dragged the pointer far from
    // the parking seam; the engine warps it back and ends the tick.
    h.tick_at(1000, 540, 0.25);
    let display = h.display.lock().unwrap();
    assert_eq!(display.pointer, Position::new(1917, 540));
    drop(display);
    assert!(
        h.transport.mouse_payloads("penguin").is_empty(),
        "enforcement tick forwards nothing"
    );

    // Outside the 0.5 s window drift is ordinary motion again.
    h.tick_at(1000, 540, 0.90);
    assert_eq!(h.transport.mouse_payloads("penguin").len(), 1);
}

#[test]
fn test_native_session_skips_warp_enforcement() {
    let mut h = Harness::new(false);
    h.enter_west();

    h.tick_at(1000, 540, 0.25);
    assert_eq!(
        h.transport.mouse_payloads("penguin").len(),
        1,
        "native sessions forward immediately, no enforcement"
    );
}
