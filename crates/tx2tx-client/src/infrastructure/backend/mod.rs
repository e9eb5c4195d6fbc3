//! Display/injection backend selection for the client.

pub mod mock;

use tx2tx_core::backend::{BackendError, DisplayBackend, InputInjector};
use tx2tx_core::domain::geometry::Screen;

/// Creates the display backend and input injector for the configured
/// backend name.
///
/// `mock` (alias `headless`) is the in-memory backend used by tests and
/// headless runs. Platform backends (x11, wayland) integrate through the
/// [`DisplayBackend`] / [`InputInjector`] contracts and are not part of
/// this build.
///
/// # Errors
///
/// Returns [`BackendError::Unsupported`] for any other name.
pub fn client_backend_create(
    name: &str,
) -> Result<(Box<dyn DisplayBackend>, Box<dyn InputInjector>), BackendError> {
    match name.to_ascii_lowercase().as_str() {
        "mock" | "headless" => {
            let (display, _state) = mock::MockClientDisplay::new(Screen::new(1920, 1080));
            let (injector, _injected) = mock::RecordingInjector::new();
            Ok((Box::new(display), Box::new(injector)))
        }
        other => Err(BackendError::Unsupported(other.to_string())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
