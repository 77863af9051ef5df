//! rwire - An asynchronous outbound packet writer for persistent connections, built on Tokio.
//!
//! A [`Connection`] owns an ordered outbound queue and one writer task per
//! transport. Packets that fail to be written are reported to failure
//! listeners rather than silently lost, and the first fatal write failure is
//! escalated to the connection's [`IReader`].

pub mod connection;
pub mod error;
pub mod listener;
pub mod message;
pub mod runtime;
pub mod transport;
pub mod writer;

// Re-export core types for user convenience
pub use connection::{Connection, ConnectionStatus, IConnection, IReader};
pub use error::WireError;
pub use listener::{AcceptAll, AndFilter, NotFilter, OrFilter, PacketFilter, PacketListener};
pub use message::{Msg, Packet};
pub use runtime::WriterState;
pub use writer::{MonitorReceiver, WriterEvent, WriterOptions};

// --- Top-Level Functions ---

const VERSION_MAJOR: i32 = 0;
const VERSION_MINOR: i32 = 1;
const VERSION_PATCH: i32 = 0;

/// Returns the library version as a tuple (major, minor, patch).
pub fn version() -> (i32, i32, i32) {
  (VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}

/// Returns the major version number of the library.
pub fn version_major() -> i32 {
  VERSION_MAJOR
}

/// Returns the minor version number of the library.
pub fn version_minor() -> i32 {
  VERSION_MINOR
}

/// Returns the patch version number of the library.
pub fn version_patch() -> i32 {
  VERSION_PATCH
}
