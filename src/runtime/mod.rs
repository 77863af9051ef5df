// src/runtime/mod.rs

//! Core asynchronous primitives: the outbound queue, writer state and activity tracking.

pub mod last_active;
pub mod queue;
pub mod state;

pub use last_active::LastActive;
pub use queue::{OutboundQueue, DEFAULT_POLL_INTERVAL};
pub use state::{Generation, StateCell, WriterState};
