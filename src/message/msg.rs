use crate::message::Packet;
use bytes::Bytes;
use std::fmt;

/// A single pre-encoded outbound packet.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Msg {
  // Use Bytes for efficient slicing and cloning (reference counted)
  data: Bytes,
}

impl Msg {
  /// Creates an empty message with no data.
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a message from a `Vec<u8>`, taking ownership.
  pub fn from_vec(data: Vec<u8>) -> Self {
    Self { data: Bytes::from(data) }
  }

  /// Creates a message from `bytes::Bytes`.
  pub fn from_bytes(data: Bytes) -> Self {
    Self { data }
  }

  /// Creates a message from a static byte slice (zero-copy).
  pub fn from_static(data: &'static [u8]) -> Self {
    Self {
      data: Bytes::from_static(data),
    }
  }

  /// Returns the message payload bytes.
  pub fn data(&self) -> &[u8] {
    &self.data
  }

  /// Returns the size of the message payload in bytes.
  pub fn size(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

impl Packet for Msg {
  fn to_bytes(&self) -> Bytes {
    // Cloning Bytes only bumps the refcount.
    self.data.clone()
  }
}

impl From<&'static str> for Msg {
  fn from(s: &'static str) -> Self {
    Msg::from_static(s.as_bytes())
  }
}

impl From<Vec<u8>> for Msg {
  fn from(v: Vec<u8>) -> Self {
    Msg::from_vec(v)
  }
}

impl fmt::Debug for Msg {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Msg")
      .field("size", &self.size())
      .finish() // Avoid printing large data
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn to_bytes_returns_payload() {
    let msg = Msg::from_static(b"<presence/>");
    assert_eq!(msg.to_bytes().as_ref(), b"<presence/>");
    assert_eq!(msg.size(), 11);
    assert!(Msg::new().is_empty());
  }
}
