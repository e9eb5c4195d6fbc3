//! # tx2tx-core
//!
//! Shared library for tx2tx containing the JSON line protocol codec, the
//! domain types and coordinate normalization law, the velocity-filtered
//! pointer tracker, keysym translation tables, the configuration schema,
//! and the platform backend contracts.
//!
//! This crate is used by both the server and client applications.
//! It has zero dependencies on OS APIs or network sockets.

pub mod backend;
pub mod config;
pub mod domain;
pub mod keymap;
pub mod logging;
pub mod protocol;

/// Re-export commonly used types at the crate root for convenience.
pub use backend::{BackendError, DisplayBackend, InputCapturer, InputInjector};
pub use domain::events::{EventType, InputEvent, KeyEvent, MouseEvent, ScreenTransition};
pub use domain::geometry::{Direction, NormalizedPoint, Position, Screen, ScreenContext};
pub use domain::tracker::PointerTracker;
pub use protocol::codec::{decode_line, encode_line, LineFramer, ProtocolError};
pub use protocol::messages::Message;
