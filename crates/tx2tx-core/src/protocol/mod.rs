//! tx2tx wire protocol: message types and the JSON line codec.

pub mod codec;
pub mod messages;
