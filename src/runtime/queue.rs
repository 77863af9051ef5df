// src/runtime/queue.rs

//! The outbound packet queue, backed by `async-channel`.

use crate::error::WireError;
use async_channel::{Receiver, Sender, TryRecvError, TrySendError};
use std::fmt;
use std::time::Duration;

/// Default time the writer waits on an empty queue before re-checking its stop condition.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// FIFO of packets waiting for the writer.
///
/// Producers may enqueue from any task or thread. Only the writer task is
/// expected to wait in [`dequeue_timeout`](Self::dequeue_timeout). Closing the
/// queue is permanent: further enqueues fail with [`WireError::QueueClosed`],
/// while packets already queued remain available to [`drain_all`](Self::drain_all).
pub struct OutboundQueue<P> {
  tx: Sender<P>,
  rx: Receiver<P>,
}

impl<P> OutboundQueue<P> {
  /// Creates an unbounded queue.
  pub fn unbounded() -> Self {
    let (tx, rx) = async_channel::unbounded();
    Self { tx, rx }
  }

  /// Creates a queue holding at most `capacity` packets (minimum 1).
  pub fn bounded(capacity: usize) -> Self {
    let (tx, rx) = async_channel::bounded(capacity.max(1));
    Self { tx, rx }
  }

  /// `None` selects an unbounded queue.
  pub fn with_capacity(capacity: Option<usize>) -> Self {
    match capacity {
      Some(cap) => Self::bounded(cap),
      None => Self::unbounded(),
    }
  }

  /// Appends a packet at the tail, waiting for room if the queue is bounded and full.
  pub async fn enqueue(&self, packet: P) -> Result<(), WireError> {
    self.tx.send(packet).await.map_err(|_| WireError::QueueClosed)
  }

  /// Appends a packet without waiting.
  pub fn try_enqueue(&self, packet: P) -> Result<(), WireError> {
    match self.tx.try_send(packet) {
      Ok(()) => Ok(()),
      Err(TrySendError::Full(_)) => Err(WireError::ResourceLimitReached),
      Err(TrySendError::Closed(_)) => Err(WireError::QueueClosed),
    }
  }

  /// Removes the head of the queue, waiting at most `timeout` for one to arrive.
  ///
  /// Returns `None` when the timeout elapses, or immediately when the queue is
  /// closed and empty. Neither case is an error; the caller re-checks its own
  /// stop condition.
  pub async fn dequeue_timeout(&self, timeout: Duration) -> Option<P> {
    match tokio::time::timeout(timeout, self.rx.recv()).await {
      Ok(Ok(packet)) => Some(packet),
      Ok(Err(_closed)) => None,
      Err(_elapsed) => None,
    }
  }

  /// Removes and returns every queued packet in FIFO order.
  pub fn drain_all(&self) -> Vec<P> {
    let mut drained = Vec::with_capacity(self.rx.len());
    loop {
      match self.rx.try_recv() {
        Ok(packet) => drained.push(packet),
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
      }
    }
    drained
  }

  /// Permanently closes the queue for producers. Returns `true` if this call closed it.
  pub fn close(&self) -> bool {
    self.tx.close()
  }

  pub fn is_closed(&self) -> bool {
    self.tx.is_closed()
  }

  pub fn len(&self) -> usize {
    self.rx.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rx.is_empty()
  }

  /// Capacity of a bounded queue, `None` when unbounded.
  pub fn capacity(&self) -> Option<usize> {
    self.tx.capacity()
  }
}

// Manual impl: deriving would require `P: Clone`.
impl<P> Clone for OutboundQueue<P> {
  fn clone(&self) -> Self {
    Self {
      tx: self.tx.clone(),
      rx: self.rx.clone(),
    }
  }
}

impl<P> fmt::Debug for OutboundQueue<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OutboundQueue")
      .field("len", &self.len())
      .field("capacity", &self.capacity())
      .field("closed", &self.is_closed())
      .finish()
  }
}
