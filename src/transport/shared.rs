// src/transport/shared.rs

use crate::error::WireError;
use crate::transport::WireStream;

use std::fmt;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard};

/// A transport write half shared by every writer of a connection.
///
/// All writes go through one async mutex spanning write + flush, so the packet
/// writer and the keep-alive task never interleave bytes of two frames. The
/// stream lives in an `Option` so that releasing it is visible to every holder:
/// writes after release fail with [`WireError::ConnectionClosed`].
pub struct SharedTransport<W> {
  inner: Arc<Mutex<Option<W>>>,
}

impl<W: WireStream> SharedTransport<W> {
  pub fn new(stream: W) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Some(stream))),
    }
  }

  /// Acquires exclusive write access. The lock is released when the guard drops.
  pub async fn lock(&self) -> TransportGuard<'_, W> {
    TransportGuard {
      guard: self.inner.lock().await,
    }
  }

  /// Locks, writes `frame` in full and flushes, as one exclusive unit.
  pub async fn write_frame(&self, frame: &[u8]) -> Result<(), WireError> {
    self.lock().await.write_frame(frame).await
  }

  /// Shuts the stream down and drops it. Returns `false` if it was already released.
  pub async fn release(&self) -> bool {
    self.lock().await.release().await
  }

  pub async fn is_released(&self) -> bool {
    self.inner.lock().await.is_none()
  }
}

// Manual impl: deriving would require `W: Clone`.
impl<W> Clone for SharedTransport<W> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl<W> fmt::Debug for SharedTransport<W> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SharedTransport")
      .field("holders", &Arc::strong_count(&self.inner))
      .finish_non_exhaustive()
  }
}

/// Scoped exclusive access to a [`SharedTransport`].
pub struct TransportGuard<'a, W> {
  guard: MutexGuard<'a, Option<W>>,
}

impl<'a, W: WireStream> TransportGuard<'a, W> {
  /// Writes `frame` in full and flushes.
  pub async fn write_frame(&mut self, frame: &[u8]) -> Result<(), WireError> {
    let stream = self.guard.as_mut().ok_or(WireError::ConnectionClosed)?;
    stream.write_all(frame).await.map_err(WireError::from_io)?;
    stream.flush().await.map_err(WireError::from_io)
  }

  /// Shuts the stream down (best effort) and drops it.
  pub async fn release(&mut self) -> bool {
    match self.guard.take() {
      Some(mut stream) => {
        if let Err(e) = stream.shutdown().await {
          tracing::debug!(error = %e, "Transport shutdown reported an error during release");
        }
        true
      }
      None => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::io::AsyncReadExt;

  #[tokio::test]
  async fn frames_are_written_whole_and_release_closes() {
    let (client, mut server) = tokio::io::duplex(64);
    let transport = SharedTransport::new(client);

    transport.write_frame(b"<a/>").await.unwrap();
    transport.clone().write_frame(b"<b/>").await.unwrap();
    assert!(transport.release().await);
    assert!(!transport.release().await);
    assert!(transport.is_released().await);

    let mut received = Vec::new();
    server.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"<a/><b/>");

    let err = transport.write_frame(b"<c/>").await.unwrap_err();
    assert!(matches!(err, WireError::ConnectionClosed));
  }

  #[tokio::test]
  async fn write_to_dropped_peer_fails() {
    let (client, server) = tokio::io::duplex(64);
    drop(server);
    let transport = SharedTransport::new(client);
    let err = transport.write_frame(b"lost").await.unwrap_err();
    assert!(err.is_transport_failure());
  }
}
