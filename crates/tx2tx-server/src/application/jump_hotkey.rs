//! Jump hotkey state machine.
//!
//! A configured *prefix* chord (e.g. Ctrl+/) arms a short window; an
//! *action* key pressed and released inside the window resolves to a target
//! context, teleporting between screens without an edge crossing. Every key
//! that participates in the sequence is consumed ("swallowed") so half of a
//! chord never leaks through to the remote client, including the releases
//! that trail the sequence.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::info;
use tx2tx_core::config;
use tx2tx_core::domain::events::{EventType, InputEvent, KeyEvent};
use tx2tx_core::domain::geometry::ScreenContext;
use tx2tx_core::keymap;

/// X11 KP_Divide, accepted as an alternate for a slash prefix.
const KEYSYM_KP_DIVIDE: u32 = 0xFFAF;

/// Resolved jump hotkey configuration: key names from the config file are
/// translated to keysyms (and fallback keycodes) once at startup.
#[derive(Debug, Clone)]
pub struct JumpHotkey {
    pub enabled: bool,
    pub prefix_keysym: u32,
    pub prefix_alt_keysyms: HashSet<u32>,
    pub prefix_fallback_keycodes: HashSet<u32>,
    pub prefix_modifier_mask: u32,
    pub timeout: Duration,
    pub action_keysyms: HashMap<u32, ScreenContext>,
    pub action_keycodes: HashMap<u32, ScreenContext>,
}

impl JumpHotkey {
    /// A disabled hotkey that consumes nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            prefix_keysym: 0,
            prefix_alt_keysyms: HashSet::new(),
            prefix_fallback_keycodes: HashSet::new(),
            prefix_modifier_mask: 0,
            timeout: Duration::ZERO,
            action_keysyms: HashMap::new(),
            action_keycodes: HashMap::new(),
        }
    }

    /// Resolves the config section. An unresolvable prefix key disables the
    /// hotkey entirely (a half-working chord would swallow keys forever).
    pub fn from_config(cfg: &config::JumpHotkeyConfig) -> Self {
        if !cfg.enabled {
            return Self::disabled();
        }
        let Some(prefix_keysym) = keymap::keysym_from_name(&cfg.prefix_key) else {
            tracing::warn!(
                "jump hotkey prefix key {:?} did not resolve, disabling jump hotkey",
                cfg.prefix_key
            );
            return Self::disabled();
        };

        let mut prefix_alt_keysyms = HashSet::new();
        if prefix_keysym == 0x2F {
            prefix_alt_keysyms.insert(KEYSYM_KP_DIVIDE);
        }

        let mut action_keysyms = HashMap::new();
        let mut action_keycodes = HashMap::new();
        let actions = [
            (&cfg.west_key, ScreenContext::West),
            (&cfg.east_key, ScreenContext::East),
            (&cfg.center_key, ScreenContext::Center),
        ];
        for (name, context) in actions {
            match keymap::keysym_from_name(name) {
                Some(keysym) => {
                    action_keysyms.insert(keysym, context);
                }
                None => tracing::warn!("jump hotkey action key {name:?} did not resolve"),
            }
            let mut chars = name.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                if let Some(keycode) = keymap::fallback_keycode_for_digit(c) {
                    action_keycodes.insert(keycode, context);
                }
            }
        }

        Self {
            enabled: true,
            prefix_keysym,
            prefix_alt_keysyms,
            prefix_fallback_keycodes: HashSet::new(),
            prefix_modifier_mask: keymap::modifier_mask_from_names(&cfg.prefix_modifiers),
            timeout: Duration::from_millis(cfg.timeout_ms),
            action_keysyms,
            action_keycodes,
        }
    }
}

/// Per-sequence mutable state, embedded in the engine's runtime state.
#[derive(Debug, Default)]
pub struct JumpHotkeyState {
    /// End of the armed window; `None` or past means idle.
    pub armed_until: Option<Instant>,
    /// Action context recorded by a press, awaiting its release.
    pub pending_target: Option<ScreenContext>,
    /// Keysyms whose release must be consumed rather than forwarded.
    pub swallow_keysyms: HashSet<u32>,
}

impl JumpHotkeyState {
    fn is_armed(&self, now: Instant) -> bool {
        self.armed_until.is_some_and(|until| now <= until)
    }
}

/// Runs one input batch through the hotkey state machine.
///
/// Returns the events that should continue down the pipeline (sequence
/// participants removed) and the resolved target context, if the batch
/// completed a sequence.
pub fn events_process(
    events: Vec<InputEvent>,
    modifier_state: u32,
    hotkey: &JumpHotkey,
    state: &mut JumpHotkeyState,
    now: Instant,
) -> (Vec<InputEvent>, Option<ScreenContext>) {
    if !hotkey.enabled {
        return (events, None);
    }

    arm_expiry_apply(state, now);

    let mut filtered = Vec::with_capacity(events.len());
    let mut target = None;

    for event in events {
        let key = match event {
            InputEvent::Key(key) => key,
            other => {
                filtered.push(other);
                continue;
            }
        };
        match key.event_type {
            EventType::KeyRelease => {
                let (consumed, resolved) = key_release_process(&key, hotkey, state, now);
                if let Some(context) = resolved {
                    target = Some(context);
                }
                if !consumed {
                    filtered.push(InputEvent::Key(key));
                }
            }
            EventType::KeyPress => {
                if !key_press_process(&key, modifier_state, hotkey, state, now) {
                    filtered.push(InputEvent::Key(key));
                }
            }
            _ => filtered.push(InputEvent::Key(key)),
        }
    }

    (filtered, target)
}

/// Drops an expired armed window silently. The swallow set survives so the
/// releases of already-consumed presses still get eaten.
fn arm_expiry_apply(state: &mut JumpHotkeyState, now: Instant) {
    if state.armed_until.is_some() && !state.is_armed(now) {
        state.armed_until = None;
        state.pending_target = None;
    }
}

/// Returns `(consumed, resolved_target)` for one release event.
fn key_release_process(
    key: &KeyEvent,
    hotkey: &JumpHotkey,
    state: &mut JumpHotkeyState,
    now: Instant,
) -> (bool, Option<ScreenContext>) {
    let resolved = action_context_resolve(key, hotkey);
    if state.is_armed(now) && state.pending_target.is_some() && resolved == state.pending_target {
        state.armed_until = None;
        state.pending_target = None;
        if let Some(context) = resolved {
            info!("[HOTKEY] action captured: {context}");
        }
        return (true, resolved);
    }

    if let Some(keysym) = key.keysym {
        if state.swallow_keysyms.remove(&keysym) {
            return (true, None);
        }
    }
    (false, None)
}

/// Returns `true` when the press was consumed by the hotkey flow.
fn key_press_process(
    key: &KeyEvent,
    modifier_state: u32,
    hotkey: &JumpHotkey,
    state: &mut JumpHotkeyState,
    now: Instant,
) -> bool {
    if prefix_press_matches(key, modifier_state, hotkey) {
        state.armed_until = Some(now + hotkey.timeout);
        state.pending_target = None;
        keysym_swallow_add(key.keysym, state);
        info!("[HOTKEY] prefix captured");
        return true;
    }

    if !state.is_armed(now) {
        return false;
    }

    // While armed, every press is part of the sequence: record an action if
    // it resolves, and swallow the key either way.
    if let Some(context) = action_context_resolve(key, hotkey) {
        state.pending_target = Some(context);
    }
    keysym_swallow_add(key.keysym, state);
    true
}

fn action_context_resolve(key: &KeyEvent, hotkey: &JumpHotkey) -> Option<ScreenContext> {
    if let Some(keysym) = key.keysym {
        if let Some(&context) = hotkey.action_keysyms.get(&keysym) {
            return Some(context);
        }
    }
    hotkey.action_keycodes.get(&key.keycode).copied()
}

fn prefix_press_matches(key: &KeyEvent, modifier_state: u32, hotkey: &JumpHotkey) -> bool {
    let token_matches = key.keysym == Some(hotkey.prefix_keysym)
        || key
            .keysym
            .is_some_and(|keysym| hotkey.prefix_alt_keysyms.contains(&keysym))
        || hotkey.prefix_fallback_keycodes.contains(&key.keycode);
    if !token_matches {
        return false;
    }
    if hotkey.prefix_modifier_mask == 0 {
        return true;
    }
    let event_state = key.state.unwrap_or(modifier_state);
    (event_state & hotkey.prefix_modifier_mask) == hotkey.prefix_modifier_mask
}

fn keysym_swallow_add(keysym: Option<u32>, state: &mut JumpHotkeyState) {
    if let Some(keysym) = keysym {
        state.swallow_keysyms.insert(keysym);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SLASH: u32 = 0x2F;
    const DIGIT_1: u32 = 0x31;
    const DIGIT_0: u32 = 0x30;
    const CTRL_MASK: u32 = 0x4;

    fn hotkey() -> JumpHotkey {
        let cfg = config::JumpHotkeyConfig {
            enabled: true,
            ..config::JumpHotkeyConfig::default()
        };
        JumpHotkey::from_config(&cfg)
    }

    fn press(keysym: u32, state: u32) -> InputEvent {
        InputEvent::Key(KeyEvent::press(0, Some(keysym), Some(state)))
    }

    fn release(keysym: u32, state: u32) -> InputEvent {
        InputEvent::Key(KeyEvent::release(0, Some(keysym), Some(state)))
    }

    #[test]
    fn test_resolved_config_maps_default_actions() {
        let hotkey = hotkey();
        assert_eq!(hotkey.prefix_keysym, SLASH);
        assert_eq!(hotkey.prefix_modifier_mask, CTRL_MASK);
        assert_eq!(hotkey.action_keysyms.get(&DIGIT_1), Some(&ScreenContext::West));
        assert_eq!(hotkey.action_keysyms.get(&0x32), Some(&ScreenContext::East));
        assert_eq!(hotkey.action_keysyms.get(&DIGIT_0), Some(&ScreenContext::Center));
        // pc105 fallback keycodes for the digit row.
        assert_eq!(hotkey.action_keycodes.get(&10), Some(&ScreenContext::West));
        assert_eq!(hotkey.action_keycodes.get(&19), Some(&ScreenContext::Center));
    }

    #[test]
    fn test_full_sequence_resolves_west() {
        let hotkey = hotkey();
        let mut state = JumpHotkeyState::default();
        let t0 = Instant::now();

        // Ctrl+/ press arms; consumed.
        let (filtered, target) =
            events_process(vec![press(SLASH, CTRL_MASK)], CTRL_MASK, &hotkey, &mut state, t0);
        assert!(filtered.is_empty());
        assert_eq!(target, None);
        assert!(state.is_armed(t0));

        // '1' press records the pending target; consumed.
        let (filtered, target) =
            events_process(vec![press(DIGIT_1, 0)], 0, &hotkey, &mut state, t0);
        assert!(filtered.is_empty());
        assert_eq!(target, None);
        assert_eq!(state.pending_target, Some(ScreenContext::West));

        // '1' release resolves the sequence.
        let (filtered, target) =
            events_process(vec![release(DIGIT_1, 0)], 0, &hotkey, &mut state, t0);
        assert!(filtered.is_empty());
        assert_eq!(target, Some(ScreenContext::West));
        assert!(!state.is_armed(t0));
    }

    #[test]
    fn test_prefix_without_required_modifier_passes_through() {
        let hotkey = hotkey();
        let mut state = JumpHotkeyState::default();
        let t0 = Instant::now();
        let (filtered, target) =
            events_process(vec![press(SLASH, 0)], 0, &hotkey, &mut state, t0);
        assert_eq!(filtered.len(), 1);
        assert_eq!(target, None);
        assert!(!state.is_armed(t0));
    }

    #[test]
    fn test_armed_window_expires_silently() {
        let hotkey = hotkey();
        let mut state = JumpHotkeyState::default();
        let t0 = Instant::now();
        events_process(vec![press(SLASH, CTRL_MASK)], CTRL_MASK, &hotkey, &mut state, t0);

        // After the timeout, the action press is an ordinary key again.
        let later = t0 + hotkey.timeout + Duration::from_millis(1);
        let (filtered, target) =
            events_process(vec![press(DIGIT_1, 0)], 0, &hotkey, &mut state, later);
        assert_eq!(filtered.len(), 1);
        assert_eq!(target, None);
        assert_eq!(state.pending_target, None);
    }

    #[test]
    fn test_swallowed_keysym_release_is_consumed_once() {
        let hotkey = hotkey();
        let mut state = JumpHotkeyState::default();
        let t0 = Instant::now();
        events_process(vec![press(SLASH, CTRL_MASK)], CTRL_MASK, &hotkey, &mut state, t0);

        // The prefix release (after expiry or mid-sequence) never leaks.
        let (filtered, _) = events_process(vec![release(SLASH, 0)], 0, &hotkey, &mut state, t0);
        assert!(filtered.is_empty());

        // A second release of the same keysym is no longer swallowed.
        let (filtered, _) = events_process(vec![release(SLASH, 0)], 0, &hotkey, &mut state, t0);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_non_action_press_while_armed_is_swallowed() {
        let hotkey = hotkey();
        let mut state = JumpHotkeyState::default();
        let t0 = Instant::now();
        events_process(vec![press(SLASH, CTRL_MASK)], CTRL_MASK, &hotkey, &mut state, t0);

        let (filtered, target) =
            events_process(vec![press(0x63, 0)], 0, &hotkey, &mut state, t0);
        assert!(filtered.is_empty(), "presses inside the armed window are consumed");
        assert_eq!(target, None);
        assert_eq!(state.pending_target, None);
    }

    #[test]
    fn test_mouse_events_pass_through_untouched() {
        use tx2tx_core::domain::events::MouseEvent;
        use tx2tx_core::domain::geometry::Position;

        let hotkey = hotkey();
        let mut state = JumpHotkeyState::default();
        let motion = InputEvent::Mouse(MouseEvent::motion(Position::new(5, 5)));
        let (filtered, target) =
            events_process(vec![motion], 0, &hotkey, &mut state, Instant::now());
        assert_eq!(filtered.len(), 1);
        assert_eq!(target, None);
    }

    #[test]
    fn test_disabled_hotkey_is_transparent() {
        let hotkey = JumpHotkey::disabled();
        let mut state = JumpHotkeyState::default();
        let (filtered, target) = events_process(
            vec![press(SLASH, CTRL_MASK)],
            CTRL_MASK,
            &hotkey,
            &mut state,
            Instant::now(),
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(target, None);
    }

    #[test]
    fn test_center_action_resolves_for_return_jumps() {
        let hotkey = hotkey();
        let mut state = JumpHotkeyState::default();
        let t0 = Instant::now();
        events_process(vec![press(SLASH, CTRL_MASK)], CTRL_MASK, &hotkey, &mut state, t0);
        events_process(vec![press(DIGIT_0, 0)], 0, &hotkey, &mut state, t0);
        let (_, target) = events_process(vec![release(DIGIT_0, 0)], 0, &hotkey, &mut state, t0);
        assert_eq!(target, Some(ScreenContext::Center));
    }

    #[test]
    fn test_keycode_fallback_resolves_without_keysyms() {
        let hotkey = hotkey();
        let mut state = JumpHotkeyState::default();
        let t0 = Instant::now();
        events_process(vec![press(SLASH, CTRL_MASK)], CTRL_MASK, &hotkey, &mut state, t0);

        // Keycode 10 is the pc105 '1' key; no keysym resolved.
        let keyless_press = InputEvent::Key(KeyEvent::press(10, None, None));
        let keyless_release = InputEvent::Key(KeyEvent::release(10, None, None));
        events_process(vec![keyless_press], 0, &hotkey, &mut state, t0);
        assert_eq!(state.pending_target, Some(ScreenContext::West));
        let (_, target) = events_process(vec![keyless_release], 0, &hotkey, &mut state, t0);
        assert_eq!(target, Some(ScreenContext::West));
    }
}
