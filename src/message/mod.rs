//! Packet-related types (`Packet`, `Msg`).

mod msg;
mod packet;

pub use msg::Msg;
pub use packet::Packet;
