// src/connection/mod.rs

pub mod core; // Contains the Connection facade

pub use self::core::Connection;

use crate::error::WireError;

use std::sync::atomic::{AtomicBool, Ordering};

/// The connection as seen by its packet writer.
pub trait IConnection: Send + Sync + 'static {
  /// True once the transport has been reported closed (by a disconnect or by the reader).
  /// The writer suppresses escalation while this holds.
  fn is_transport_closed(&self) -> bool;
}

/// The reader half of a connection, told about fatal write errors.
pub trait IReader: Send + Sync + 'static {
  /// Called by the writer at most once per failure episode when a write fails fatally.
  /// Runs on the writer task: must not block, and is expected to drive teardown
  /// (close the transport, notify connection listeners) elsewhere.
  fn notify_connection_error(&self, cause: WireError);
}

/// Closed/open flag shared between a connection and its writers.
#[derive(Debug, Default)]
pub struct ConnectionStatus {
  closed: AtomicBool,
}

impl ConnectionStatus {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns `true` if this call flipped the flag.
  pub fn mark_closed(&self) -> bool {
    !self.closed.swap(true, Ordering::AcqRel)
  }

  pub fn reset(&self) {
    self.closed.store(false, Ordering::Release);
  }
}

impl IConnection for ConnectionStatus {
  fn is_transport_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }
}
