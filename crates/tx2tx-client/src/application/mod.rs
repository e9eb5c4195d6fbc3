//! Application layer: the receive/inject session.

pub mod session;
