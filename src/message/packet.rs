// src/message/packet.rs

use bytes::Bytes;
use std::fmt;

/// An outbound unit the writer can put on the wire.
///
/// The encoding itself belongs to the application protocol; the writer only
/// asks for the final bytes, once per write attempt, while holding the
/// transport lock. Implementations must be cheap to call and must not block.
pub trait Packet: fmt::Debug + Send + Sync + 'static {
  /// Returns the serialized wire form of this packet.
  fn to_bytes(&self) -> Bytes;
}

impl Packet for Bytes {
  fn to_bytes(&self) -> Bytes {
    self.clone()
  }
}

impl Packet for String {
  fn to_bytes(&self) -> Bytes {
    Bytes::copy_from_slice(self.as_bytes())
  }
}
