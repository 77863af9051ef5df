// src/listener/mod.rs

//! Filtered packet observers: the listener and filter traits and the registry that invokes them.

pub mod filter;
pub mod registry;

pub use filter::{AcceptAll, AndFilter, NotFilter, OrFilter, PacketFilter};
pub use registry::{ListenerRegistry, PacketListener};
