//! The client receive/inject session.
//!
//! Maps inbound server messages to local side effects: mouse events are
//! denormalized against the local screen and injected (or, for the hide
//! signal, the cursor is hidden and nothing is injected), key events go
//! straight to the injector, and hint messages are delegated to the
//! overlay. Injection failures are logged per event and never stop the
//! session.

use tracing::{debug, info, warn};

use tx2tx_core::backend::{DisplayBackend, InputInjector};
use tx2tx_core::domain::events::{EventType, MouseEvent};
use tx2tx_core::protocol::messages::{KeyEventPayload, Message, MouseEventPayload};

/// Hint overlay collaborator. Rendering is external; the session only
/// forwards show/hide requests and gives the overlay a chance to expire
/// its timeout once per loop tick.
pub trait HintOverlay {
    fn show(&mut self, label: &str, timeout_ms: u64);
    fn hide(&mut self);
    fn poll(&mut self);
}

/// Overlay that renders nothing. Used when no overlay is wired in.
#[derive(Debug, Default)]
pub struct NullOverlay;

impl HintOverlay for NullOverlay {
    fn show(&mut self, label: &str, timeout_ms: u64) {
        debug!("hint show {label:?} ({timeout_ms} ms) ignored: no overlay");
    }

    fn hide(&mut self) {}

    fn poll(&mut self) {}
}

/// The receive/inject session. Owns the display backend, the injector,
/// and the overlay; the network stays outside so the loop in `main` can
/// drive reconnects.
pub struct ClientSession<D: DisplayBackend, I: InputInjector, O: HintOverlay> {
    display: D,
    injector: I,
    overlay: O,
}

impl<D: DisplayBackend, I: InputInjector, O: HintOverlay> ClientSession<D, I, O> {
    pub fn new(display: D, injector: I, overlay: O) -> Self {
        Self {
            display,
            injector,
            overlay,
        }
    }

    /// Dispatches one inbound server message.
    pub fn server_message_handle(&mut self, message: Message) {
        match message {
            Message::Hello(payload) => info!("server handshake: version={}", payload.version),
            Message::ScreenInfo(payload) => {
                info!("server screen info: {}x{}", payload.width, payload.height);
            }
            Message::ScreenEnter(_) | Message::ScreenLeave(_) => {
                debug!("received legacy screen transition message (informational)");
            }
            Message::MouseEvent(payload) => self.mouse_message_handle(payload),
            Message::KeyEvent(payload) => self.key_message_handle(payload),
            Message::HintShow(payload) => {
                let label = payload.label.trim();
                if !label.is_empty() {
                    self.overlay.show(label, payload.timeout_ms);
                }
            }
            Message::HintHide => self.overlay.hide(),
            Message::Keepalive => debug!("keepalive received"),
            Message::Error(payload) => warn!("server error: {}", payload.error),
        }
    }

    /// Lets the overlay expire its timeout; called once per loop tick.
    pub fn overlay_poll(&mut self) {
        self.overlay.poll();
    }

    /// Closes the display connection on shutdown.
    pub fn shutdown(&mut self) {
        self.display.connection_close();
    }

    fn mouse_message_handle(&mut self, payload: MouseEventPayload) {
        let event = match payload.into_event() {
            Ok(event) => event,
            Err(err) => {
                warn!("dropping malformed mouse event: {err}");
                return;
            }
        };
        let Some(injectable) = self.injection_event_build(event) else {
            return;
        };
        if let Err(err) = self.injector.mouse_event_inject(&injectable) {
            warn!("failed to inject mouse event: {err}");
            return;
        }
        match injectable.position {
            Some(pos) if injectable.event_type == EventType::MouseMove => {
                debug!("cursor at {pos}");
            }
            _ => info!(
                "mouse {:?}: button={:?}",
                injectable.event_type, injectable.button
            ),
        }
    }

    /// Converts an inbound mouse event into an injection-ready pixel event.
    ///
    /// A hide signal hides the local cursor and yields nothing; any other
    /// normalized point is denormalized against the local screen, with the
    /// cursor shown before injection. Legacy pixel events pass through.
    fn injection_event_build(&mut self, event: MouseEvent) -> Option<MouseEvent> {
        let Some(point) = event.normalized_point else {
            return Some(event);
        };

        if point.is_hide_signal() {
            if let Err(err) = self.display.cursor_hide() {
                warn!("cursor hide failed: {err}");
            }
            info!("cursor hidden");
            return None;
        }

        let screen = match self.display.screen_geometry() {
            Ok(screen) => screen,
            Err(err) => {
                warn!("cannot read local screen geometry: {err}");
                return None;
            }
        };
        let position = screen.denormalize(point);
        if let Err(err) = self.display.cursor_show() {
            warn!("cursor show failed: {err}");
        }
        Some(MouseEvent {
            event_type: event.event_type,
            position: Some(position),
            normalized_point: None,
            button: event.button,
        })
    }

    fn key_message_handle(&mut self, payload: KeyEventPayload) {
        let event = payload.into_event();
        if let Err(err) = self.injector.key_event_inject(&event) {
            warn!("failed to inject key event: {err}");
            return;
        }
        match event.keysym {
            Some(keysym) => debug!(
                "key {:?}: keycode={} keysym={keysym:#x}",
                event.event_type, event.keycode
            ),
            None => debug!("key {:?}: keycode={}", event.event_type, event.keycode),
        }
    }
}
