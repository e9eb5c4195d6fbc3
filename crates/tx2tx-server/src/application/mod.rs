//! Application layer: the context engine and the jump hotkey policy.
//!
//! Everything here depends only on traits and `tx2tx-core` domain types;
//! sockets and platform backends are injected from `infrastructure`.

pub mod context_engine;
pub mod jump_hotkey;
