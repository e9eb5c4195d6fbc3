//! The server context engine.
//!
//! A single-threaded state machine driven by the poll loop in `main`. Each
//! tick samples the pointer, then dispatches on the current
//! [`ScreenContext`]: in CENTER it watches for edge transitions and jump
//! hotkey sequences; in a REMOTE context it enforces the parking warp,
//! watches the return boundary, forwards motion and input events to the
//! active client, and honors the panic key.
//!
//! All mutable state lives in one [`RuntimeState`] value owned by the
//! engine; the network is reached only through the [`ClientTransport`]
//! seam, so every policy here runs under test with recording doubles.
//! Backend failures inside a tick are caught at the tick boundary and
//! degraded into a revert to CENTER; the loop itself keeps running.

use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use tx2tx_core::backend::{BackendError, DisplayBackend, InputCapturer};
use tx2tx_core::config::PanicKeyConfig;
use tx2tx_core::domain::events::{EventType, InputEvent, MouseEvent};
use tx2tx_core::domain::geometry::{NormalizedPoint, Position, Screen, ScreenContext};
use tx2tx_core::domain::tracker::PointerTracker;
use tx2tx_core::keymap;
use tx2tx_core::protocol::messages::Message;

use crate::application::jump_hotkey::{self, JumpHotkey, JumpHotkeyState};

/// Edge detection stays disabled for this long after a return to CENTER,
/// suppressing ping-pong right after the entry warp.
pub const HYSTERESIS_DELAY: Duration = Duration::from_millis(200);

/// REMOTE→CENTER returns stay disabled for this long after entering a
/// remote context.
pub const REMOTE_RETURN_GUARD: Duration = Duration::from_millis(600);

/// Pixels from the edge for parking and entry warps. Far enough in that
/// the compositor cannot snap the pointer back onto the crossing edge.
const EDGE_PARKING_OFFSET: i32 = 30;

/// Window after a remote entry during which non-native sessions get their
/// pointer warped back if the compositor drags it off the parking seam.
const WARP_ENFORCE_WINDOW: Duration = Duration::from_millis(500);

/// Drift beyond this many pixels triggers warp enforcement.
const WARP_ENFORCE_DRIFT: i32 = 100;

/// Settle delay after an enforcement warp.
const WARP_SETTLE: Duration = Duration::from_millis(10);

/// Settle delay after the ungrab and after the cursor show of a revert,
/// letting the OS observe each step before the next.
const REVERT_SETTLE: Duration = Duration::from_millis(50);

/// Network seam the engine drives. The server network implements it; tests
/// substitute a recording transport.
pub trait ClientTransport {
    /// Sends one message to the named client. Returns `false` when the
    /// client is unknown or the write failed (the transport closes the
    /// failing peer itself).
    fn message_to_client_send(&mut self, name: &str, message: &Message) -> bool;

    /// `true` when a client with this lowercased name is connected.
    fn client_connected_check(&self, name: &str) -> bool;

    /// Names of all connected clients, for diagnostics.
    fn client_names(&self) -> Vec<String>;
}

/// Failures inside one tick. Caught at the tick boundary and degraded to a
/// revert; only startup errors terminate the process.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Mutable engine state. Created once at start, reset to initial values on
/// start and on catastrophic revert.
#[derive(Debug)]
pub struct RuntimeState {
    /// Which screen currently has input focus.
    pub context: ScreenContext,
    /// When the engine last returned to CENTER (hysteresis window).
    pub last_center_switch: Option<Instant>,
    /// When the engine last entered a remote context (return guard and
    /// warp enforcement window).
    pub last_remote_switch: Option<Instant>,
    /// Whether a boundary crossing committed the current remote context.
    pub boundary_crossed: bool,
    /// Last pointer position forwarded to the active client (motion dedup).
    pub last_sent_position: Option<Position>,
    /// Routing cache: name of the client receiving forwarded input.
    pub active_remote_client: Option<String>,
    /// Jump hotkey sequence state.
    pub jump: JumpHotkeyState,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            context: ScreenContext::Center,
            last_center_switch: None,
            last_remote_switch: None,
            boundary_crossed: false,
            last_sent_position: None,
            active_remote_client: None,
            jump: JumpHotkeyState::default(),
        }
    }
}

impl RuntimeState {
    /// Resets every field to its initial value.
    pub fn reset(&mut self) {
        *self = RuntimeState::default();
    }

    /// `true` when `position` differs from the last forwarded position (or
    /// nothing has been forwarded yet in this context).
    pub fn position_changed_check(&self, position: Position) -> bool {
        match self.last_sent_position {
            None => true,
            Some(last) => last != position,
        }
    }
}

/// How to park the local cursor when entering a remote context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parking {
    /// 30 px in from the edge opposite the crossing edge (edge-triggered
    /// entries).
    OppositeEdge,
    /// The local screen center (jump hotkey entries, which are
    /// user-initiated rather than edge-triggered).
    ScreenCenter,
}

/// Static engine configuration assembled from the config file.
#[derive(Debug)]
pub struct EngineConfig {
    pub velocity_threshold: f64,
    pub edge_threshold: i32,
    /// Context → lowercased client name routing map.
    pub context_to_client: HashMap<ScreenContext, String>,
    pub panic_keysyms: HashSet<u32>,
    pub panic_modifier_mask: u32,
    pub jump_hotkey: JumpHotkey,
}

/// The context engine. Owns the display backend, the input capturer, the
/// pointer tracker, and all runtime state.
pub struct ContextEngine<D: DisplayBackend, C: InputCapturer> {
    display: D,
    capturer: C,
    screen: Screen,
    tracker: PointerTracker,
    state: RuntimeState,
    config: EngineConfig,
}

impl<D: DisplayBackend, C: InputCapturer> ContextEngine<D, C> {
    /// Creates an engine over an established display backend.
    pub fn new(display: D, capturer: C, screen: Screen, config: EngineConfig) -> Self {
        let tracker = PointerTracker::new(config.edge_threshold, config.velocity_threshold);
        Self {
            display,
            capturer,
            screen,
            tracker,
            state: RuntimeState::default(),
            config,
        }
    }

    /// Current context.
    pub fn context(&self) -> ScreenContext {
        self.state.context
    }

    /// Read access to the runtime state, for diagnostics and tests.
    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    /// Local screen geometry.
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Runs one tick of the state machine. Backend failures revert to
    /// CENTER and are swallowed here; the poll loop keeps running.
    pub fn tick(&mut self, transport: &mut dyn ClientTransport, now: Instant) {
        if let Err(err) = self.tick_inner(transport, now) {
            error!("tick failed: {err}; reverting to center");
            let position = self
                .display
                .pointer_position()
                .unwrap_or_else(|_| Position::new(self.screen.width() / 2, self.screen.height() / 2));
            self.revert_to_center(transport, position, now);
        }
    }

    /// Closes the display connection. Safe on all exit paths.
    pub fn shutdown(&mut self) {
        self.display.connection_close();
    }

    fn tick_inner(
        &mut self,
        transport: &mut dyn ClientTransport,
        now: Instant,
    ) -> Result<(), EngineError> {
        let position = self.display.pointer_position()?;
        self.tracker.position_record(position, &self.screen, now);
        let velocity = self.tracker.velocity();

        if self.tracker.near_edge(position, &self.screen) {
            debug!("[EDGE] pos={position} vel={velocity:.1}");
        }

        match self.state.context {
            ScreenContext::Center => self.center_tick(transport, position, velocity, now),
            _ => self.remote_tick(transport, position, velocity, now),
        }
    }

    // ── CENTER context ────────────────────────────────────────────────────────

    fn center_tick(
        &mut self,
        transport: &mut dyn ClientTransport,
        position: Position,
        velocity: f64,
        now: Instant,
    ) -> Result<(), EngineError> {
        if self.hysteresis_active(now) {
            return Ok(());
        }

        if self.config.jump_hotkey.enabled {
            let (events, modifier_state) = self.capturer.input_events_read();
            let (_filtered, jump_target) = jump_hotkey::events_process(
                events,
                modifier_state,
                &self.config.jump_hotkey,
                &mut self.state.jump,
                now,
            );
            if let Some(target) = jump_target {
                self.jump_apply(transport, target, position, now);
                return Ok(());
            }
        }

        let Some(transition) = self.tracker.boundary_detect(position, &self.screen, now) else {
            return Ok(());
        };
        let target = ScreenContext::from_direction(transition.direction);
        info!(
            "[TRANSITION] boundary crossed: pos={}, velocity={:.1}px/s, direction={}, center -> {}",
            transition.position, velocity, transition.direction, target
        );
        self.remote_context_enter(transport, target, transition.position, Parking::OppositeEdge, now);
        Ok(())
    }

    /// Commits a CENTER→REMOTE transition: resolve the target client, warp
    /// to the parking position, take the grabs, hide the cursor. State
    /// mutation happens before any display side effect so a mid-sequence
    /// failure rolls back through one path.
    fn remote_context_enter(
        &mut self,
        transport: &mut dyn ClientTransport,
        target: ScreenContext,
        position: Position,
        parking: Parking,
        now: Instant,
    ) -> bool {
        if target == ScreenContext::Center {
            return true;
        }
        let Some(target_name) = self.config.context_to_client.get(&target).cloned() else {
            error!("no client configured for {target}");
            return false;
        };
        if !transport.client_connected_check(&target_name) {
            error!(
                "transition blocked: target {:?} not connected (connected: {:?})",
                target_name,
                transport.client_names()
            );
            return false;
        }

        let warp_pos = parking_position(target, position, &self.screen, parking);

        self.state.context = target;
        self.state.active_remote_client = Some(target_name);
        debug!("[CONTEXT] changed to {target}");
        info!("[WARP] parking cursor at {warp_pos} for {target}");

        if let Err(err) = self.transition_side_effects(warp_pos) {
            error!("transition failed: {err}");
            self.transition_failure_recover(now);
            return false;
        }

        self.tracker.reset();
        self.state.boundary_crossed = true;
        self.state.last_sent_position = None;
        self.state.last_remote_switch = Some(now);
        info!("[STATE] -> {target} context");
        true
    }

    /// Warp, grab, hide, in that order, so the parking warp is observable
    /// before the grabs and the grabs before the hide. A refused grab is a
    /// warning, not a failure: some compositors allow the session to work
    /// without one.
    fn transition_side_effects(&mut self, warp_pos: Position) -> Result<(), BackendError> {
        self.display.cursor_position_set(warp_pos)?;
        if let Err(err) = self.display.pointer_grab() {
            warn!("pointer grab refused: {err}");
        }
        if let Err(err) = self.display.keyboard_grab() {
            warn!("keyboard grab refused: {err}");
        }
        self.display.cursor_hide()?;
        Ok(())
    }

    fn transition_failure_recover(&mut self, now: Instant) {
        let _ = self.display.keyboard_ungrab();
        let _ = self.display.pointer_ungrab();
        let _ = self.display.cursor_show();
        self.state.context = ScreenContext::Center;
        self.state.active_remote_client = None;
        self.state.last_center_switch = Some(now);
        warn!("reverted to center after failed transition");
    }

    fn hysteresis_active(&self, now: Instant) -> bool {
        self.state
            .last_center_switch
            .is_some_and(|at| now.saturating_duration_since(at) < HYSTERESIS_DELAY)
    }

    // ── REMOTE context ────────────────────────────────────────────────────────

    fn remote_tick(
        &mut self,
        transport: &mut dyn ClientTransport,
        position: Position,
        velocity: f64,
        now: Instant,
    ) -> Result<(), EngineError> {
        // 1. Target resolution: the routing map is the source of truth and
        //    overrides a stale cached target.
        let Some(target_name) = self.remote_target_resolve() else {
            let _ = self.capturer.input_events_read();
            error!(
                "active context {} has no mapped client, reverting",
                self.state.context
            );
            self.revert_to_center(transport, position, now);
            return Ok(());
        };

        // 2. Warp enforcement for non-native sessions.
        if self.warp_enforcement_apply(position, now)? {
            return Ok(());
        }

        // 3. Return boundary.
        if self.return_triggered_check(position, velocity, now) {
            info!(
                "[BOUNDARY] returning from {} at {}",
                self.state.context, position
            );
            self.revert_to_center(transport, position, now);
            return Ok(());
        }

        // 4. Motion forwarding (deduplicated on last sent position).
        if !self.motion_forward(transport, &target_name, position, now) {
            return Ok(());
        }

        // 5.–6. Input draining and jump hotkey filtering.
        let (events, modifier_state) = self.capturer.input_events_read();
        let (events, jump_target) = jump_hotkey::events_process(
            events,
            modifier_state,
            &self.config.jump_hotkey,
            &mut self.state.jump,
            now,
        );
        if let Some(target) = jump_target {
            self.jump_apply(transport, target, position, now);
            return Ok(());
        }

        // 7. Panic key.
        if panic_key_check(
            &events,
            &self.config.panic_keysyms,
            self.config.panic_modifier_mask,
            modifier_state,
        ) {
            warn!("[PANIC] panic key pressed, forcing return to center");
            self.revert_to_center(transport, position, now);
            return Ok(());
        }

        // 8. Event forwarding.
        self.input_events_forward(transport, &target_name, position, events, now);
        Ok(())
    }

    fn remote_target_resolve(&mut self) -> Option<String> {
        match self.config.context_to_client.get(&self.state.context) {
            Some(mapped) => {
                if self.state.active_remote_client.as_deref() != Some(mapped.as_str()) {
                    if let Some(stale) = &self.state.active_remote_client {
                        warn!(
                            "correcting stale remote target {:?} -> {:?} for context {}",
                            stale, mapped, self.state.context
                        );
                    }
                    self.state.active_remote_client = Some(mapped.clone());
                }
                Some(mapped.clone())
            }
            None => self.state.active_remote_client.clone(),
        }
    }

    /// Warps a drifting pointer back to the parking seam shortly after a
    /// remote entry. Native sessions skip this: their pointer grab alone
    /// holds the cursor in place.
    fn warp_enforcement_apply(
        &mut self,
        position: Position,
        now: Instant,
    ) -> Result<bool, EngineError> {
        if self.display.session_is_native() {
            return Ok(false);
        }
        let within_window = self
            .state
            .last_remote_switch
            .is_some_and(|at| now.saturating_duration_since(at) < WARP_ENFORCE_WINDOW);
        if !within_window {
            return Ok(false);
        }
        let target_pos = match self.state.context {
            ScreenContext::West => Position::new(self.screen.width() - 3, position.y),
            ScreenContext::East => Position::new(2, position.y),
            _ => return Ok(false),
        };
        if (position.x - target_pos.x).abs() <= WARP_ENFORCE_DRIFT {
            return Ok(false);
        }
        info!("[ENFORCE] cursor at {position}, enforcing warp to {target_pos}");
        self.display.cursor_position_set(target_pos)?;
        thread::sleep(WARP_SETTLE);
        Ok(true)
    }

    fn return_triggered_check(&self, position: Position, velocity: f64, now: Instant) -> bool {
        let guard_elapsed = self
            .state
            .last_remote_switch
            .map_or(true, |at| now.saturating_duration_since(at) >= REMOTE_RETURN_GUARD);
        if !guard_elapsed {
            return false;
        }
        if !return_boundary_check(self.state.context, position, &self.screen) {
            return false;
        }
        velocity >= self.config.velocity_threshold * 0.5
    }

    fn motion_forward(
        &mut self,
        transport: &mut dyn ClientTransport,
        target_name: &str,
        position: Position,
        now: Instant,
    ) -> bool {
        if !self.state.position_changed_check(position) {
            return true;
        }
        debug!("[MOUSE] sending pos {position} to {target_name}");
        let message = Message::mouse_move_normalized(self.screen.normalize(position));
        if transport.message_to_client_send(target_name, &message) {
            self.state.last_sent_position = Some(position);
            return true;
        }
        error!(
            "failed to send movement to {:?} (connected: {:?}), reverting",
            target_name,
            transport.client_names()
        );
        self.revert_to_center(transport, position, now);
        false
    }

    fn input_events_forward(
        &mut self,
        transport: &mut dyn ClientTransport,
        target_name: &str,
        position: Position,
        events: Vec<InputEvent>,
        now: Instant,
    ) {
        for event in events {
            let Some(message) = input_event_message_build(&event, &self.screen) else {
                continue;
            };
            if transport.message_to_client_send(target_name, &message) {
                continue;
            }
            error!("failed to send event to {target_name:?}, reverting");
            self.revert_to_center(transport, position, now);
            break;
        }
    }

    // ── Jump hotkey application ───────────────────────────────────────────────

    fn jump_apply(
        &mut self,
        transport: &mut dyn ClientTransport,
        target: ScreenContext,
        position: Position,
        now: Instant,
    ) {
        if target == ScreenContext::Center {
            if self.state.context.is_remote() {
                info!("[HOTKEY] jumping to center");
                self.revert_to_center(transport, position, now);
            }
            return;
        }

        let mut position = position;
        if self.state.context.is_remote() && self.state.context != target {
            info!(
                "[HOTKEY] switching remote context {} -> {}",
                self.state.context, target
            );
            self.revert_to_center(transport, position, now);
            position = self.display.pointer_position().unwrap_or(position);
        }
        if self.state.context == target {
            return;
        }
        info!("[HOTKEY] jumping to {target}");
        self.remote_context_enter(transport, target, position, Parking::ScreenCenter, now);
    }

    // ── Revert ────────────────────────────────────────────────────────────────

    /// Safety revert to CENTER.
    ///
    /// The active client is sent the hide signal first, so its cursor
    /// disappears before the local cursor reappears. Then the step order is
    /// fixed: state, ungrab (keyboard, pointer, flush, settle), cursor show
    /// (flush, settle), the entry warp (flush), the tracker reset. Any
    /// failure falls back to a best-effort show + ungrab so the desktop is
    /// never left locked.
    pub fn revert_to_center(
        &mut self,
        transport: &mut dyn ClientTransport,
        position: Position,
        now: Instant,
    ) {
        if self.state.context == ScreenContext::Center {
            return;
        }
        warn!("[SAFETY] reverting from {} to center", self.state.context);

        if let Some(client_name) = self.state.active_remote_client.clone() {
            let hide = Message::mouse_move_normalized(NormalizedPoint::HIDE_SIGNAL);
            if !transport.message_to_client_send(&client_name, &hide) {
                debug!("hide signal to {client_name:?} not delivered");
            }
        }

        let prev_context = self.state.context;
        self.state.context = ScreenContext::Center;
        self.state.boundary_crossed = false;
        self.state.last_sent_position = None;
        self.state.active_remote_client = None;
        self.state.last_center_switch = Some(now);

        let entry_pos = entry_position(prev_context, position, &self.screen);

        let result = self.revert_side_effects(entry_pos);
        self.tracker.reset();
        match result {
            Ok(()) => info!("[STATE] -> center (revert), cursor at {entry_pos}"),
            Err(err) => {
                error!("revert to center failed: {err}");
                let _ = self.display.cursor_show();
                let _ = self.display.keyboard_ungrab();
                let _ = self.display.pointer_ungrab();
            }
        }
    }

    fn revert_side_effects(&mut self, entry_pos: Position) -> Result<(), BackendError> {
        // Ungrab first: control returns to the OS before anything else.
        let ungrab_result: Result<(), BackendError> = (|| {
            self.display.keyboard_ungrab()?;
            self.display.pointer_ungrab()?;
            self.display.connection_sync()?;
            Ok(())
        })();
        if let Err(err) = ungrab_result {
            warn!("ungrab failed: {err}");
        }
        thread::sleep(REVERT_SETTLE);

        // Show before warping: compositors ignore warps on hidden cursors.
        self.display.cursor_show()?;
        self.display.connection_sync()?;
        thread::sleep(REVERT_SETTLE);

        info!("[WARP RETURN] teleporting to entry position {entry_pos}");
        self.display.cursor_position_set(entry_pos)?;
        self.display.connection_sync()?;
        Ok(())
    }
}

// ── Pure helpers ──────────────────────────────────────────────────────────────

/// Local cursor position committed right after a CENTER→REMOTE entry.
fn parking_position(
    target: ScreenContext,
    position: Position,
    screen: &Screen,
    parking: Parking,
) -> Position {
    if parking == Parking::ScreenCenter {
        return Position::new(screen.width() / 2, screen.height() / 2);
    }
    match target {
        ScreenContext::West => {
            Position::new(screen.width() - EDGE_PARKING_OFFSET, position.y)
        }
        ScreenContext::East => Position::new(EDGE_PARKING_OFFSET, position.y),
        ScreenContext::North => {
            Position::new(position.x, screen.height() - EDGE_PARKING_OFFSET)
        }
        ScreenContext::South => Position::new(position.x, EDGE_PARKING_OFFSET),
        ScreenContext::Center => Position::new(screen.width() / 2, screen.height() / 2),
    }
}

/// Local cursor position for the entry warp of a REMOTE→CENTER revert:
/// 30 px inside the edge the pointer originally exited through.
fn entry_position(prev_context: ScreenContext, position: Position, screen: &Screen) -> Position {
    match prev_context {
        ScreenContext::West => Position::new(EDGE_PARKING_OFFSET, position.y),
        ScreenContext::East => {
            Position::new(screen.width() - EDGE_PARKING_OFFSET, position.y)
        }
        ScreenContext::North => Position::new(position.x, EDGE_PARKING_OFFSET),
        ScreenContext::South => {
            Position::new(position.x, screen.height() - EDGE_PARKING_OFFSET)
        }
        ScreenContext::Center => position,
    }
}

/// The return edge is the edge opposite the entry edge: WEST returns on the
/// right edge, EAST on the left, NORTH on the bottom, SOUTH on the top.
fn return_boundary_check(context: ScreenContext, position: Position, screen: &Screen) -> bool {
    match context {
        ScreenContext::West => position.x >= screen.width() - 1,
        ScreenContext::East => position.x <= 0,
        ScreenContext::North => position.y >= screen.height() - 1,
        ScreenContext::South => position.y <= 0,
        ScreenContext::Center => false,
    }
}

/// Builds the outbound message for one captured event: button events
/// normalize their pixel position, key events pass through with keycode,
/// advisory keysym, and modifier state.
fn input_event_message_build(event: &InputEvent, screen: &Screen) -> Option<Message> {
    match event {
        InputEvent::Mouse(mouse) => {
            let pos = mouse.position?;
            let wire_event = MouseEvent {
                event_type: mouse.event_type,
                position: None,
                normalized_point: Some(screen.normalize(pos)),
                button: mouse.button,
            };
            debug!("[BUTTON] {:?} button={:?}", mouse.event_type, mouse.button);
            Message::mouse_event(&wire_event).ok()
        }
        InputEvent::Key(key) => {
            debug!("[KEY] {:?} keycode={}", key.event_type, key.keycode);
            Some(Message::key_event(key))
        }
    }
}

/// Returns `true` when any event in the batch is a panic key press with
/// the required modifiers held. The event's own modifier state wins when
/// present; the capturer's current mask is the fallback.
pub fn panic_key_check(
    events: &[InputEvent],
    panic_keysyms: &HashSet<u32>,
    required_modifiers: u32,
    current_modifiers: u32,
) -> bool {
    for event in events {
        let InputEvent::Key(key) = event else { continue };
        if key.event_type != EventType::KeyPress {
            continue;
        }
        let event_state = key.state.unwrap_or(current_modifiers);
        if required_modifiers != 0 && (event_state & required_modifiers) != required_modifiers {
            continue;
        }
        if key.keysym.is_some_and(|keysym| panic_keysyms.contains(&keysym)) {
            return true;
        }
    }
    false
}

/// Parses the panic key configuration into a keysym set and modifier mask.
/// An unresolvable key name falls back to Scroll_Lock and Pause with no
/// modifier requirement, keeping the escape hatch alive.
pub fn panic_key_parse(cfg: &PanicKeyConfig) -> (HashSet<u32>, u32) {
    let Some(keysym) = keymap::keysym_from_name(&cfg.key) else {
        warn!("unknown panic key {:?}, using defaults", cfg.key);
        return (
            HashSet::from([keymap::KEYSYM_SCROLL_LOCK, keymap::KEYSYM_PAUSE]),
            0,
        );
    };
    let mask = keymap::modifier_mask_from_names(&cfg.modifiers);
    info!(
        "panic key configured: {} (keysym=0x{keysym:x}, mask=0x{mask:x})",
        cfg.key
    );
    (HashSet::from([keysym]), mask)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
