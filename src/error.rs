use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive] // Allows adding more variants later without breaking change
pub enum WireError {
  // --- I/O Errors ---
  #[error("I/O error: {0}")]
  Io(#[from] io::Error), // Allows easy conversion from std::io::Error

  #[error("Invalid argument provided: {0}")]
  InvalidArgument(String),

  // --- Timeouts ---
  #[error("Operation timed out")]
  Timeout,

  // --- Connection Errors ---
  #[error("Connection closed by peer or transport")]
  ConnectionClosed, // EPIPE, ECONNRESET

  // --- Queue Errors ---
  #[error("Outbound queue is closed")]
  QueueClosed,
  #[error("Resource limit reached (outbound queue full)")]
  ResourceLimitReached,

  // --- State Errors ---
  #[error("Operation is invalid for the current writer state: {0}")]
  InvalidState(&'static str),

  // --- Internal Errors ---
  #[error("Internal library error: {0}")]
  Internal(String),
}

impl WireError {
  /// Maps common `std::io::Error` kinds onto the dedicated variants.
  pub fn from_io(e: io::Error) -> Self {
    match e.kind() {
      io::ErrorKind::TimedOut => WireError::Timeout,
      io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionAborted => {
        WireError::ConnectionClosed
      }
      _ => WireError::Io(e), // Default fallback
    }
  }

  /// True for errors that mean the transport can no longer carry bytes.
  pub fn is_transport_failure(&self) -> bool {
    matches!(self, WireError::Io(_) | WireError::ConnectionClosed | WireError::Timeout)
  }
}
