//! Display/input backend selection for the server.

pub mod mock;

use tx2tx_core::backend::{BackendError, DisplayBackend, InputCapturer};
use tx2tx_core::domain::geometry::Screen;

/// Creates the display backend and input capturer for the configured
/// backend name.
///
/// `mock` (alias `headless`) is the in-memory backend used by tests and
/// headless runs. Platform backends (x11, wayland) integrate through the
/// [`DisplayBackend`] / [`InputCapturer`] contracts and are not part of
/// this build.
///
/// # Errors
///
/// Returns [`BackendError::Unsupported`] for any other name.
pub fn server_backend_create(
    name: &str,
) -> Result<(Box<dyn DisplayBackend>, Box<dyn InputCapturer>), BackendError> {
    match name.to_ascii_lowercase().as_str() {
        "mock" | "headless" => {
            let (display, _state) = mock::MockDisplayBackend::new(Screen::new(1920, 1080));
            let (capturer, _queue) = mock::MockInputCapturer::new();
            Ok((Box::new(display), Box::new(capturer)))
        }
        other => Err(BackendError::Unsupported(other.to_string())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
