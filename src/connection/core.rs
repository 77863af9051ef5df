// src/connection/core.rs

use crate::connection::{ConnectionStatus, IConnection, IReader};
use crate::error::WireError;
use crate::listener::{ListenerRegistry, PacketFilter, PacketListener};
use crate::message::Packet;
use crate::runtime::{Generation, LastActive, OutboundQueue, WriterState};
use crate::transport::WireStream;
use crate::writer::events::Monitor;
use crate::writer::{MonitorReceiver, PacketWriter, WriterContext, WriterOptions};

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Application-facing handle of one persistent connection's outbound path.
///
/// Packets handed to [`send`](Connection::send) are written in order by a
/// dedicated writer task. A packet that cannot be written is reported to the
/// failure listeners instead of being returned as an error, and the first
/// fatal write failure of an episode is escalated to the [`IReader`].
///
/// Cloning is cheap; all clones share the same queue, listeners and writer.
pub struct Connection<P: Packet> {
  inner: Arc<ConnectionInner<P>>,
}

struct ConnectionInner<P: Packet> {
  options: WriterOptions,
  queue: OutboundQueue<P>,
  failure_listeners: Arc<ListenerRegistry<P>>,
  sent_listeners: Arc<ListenerRegistry<P>>,
  last_active: Arc<LastActive>,
  generation: Generation,
  status: Arc<ConnectionStatus>,
  reader: Arc<dyn IReader>,
  monitor: Arc<Monitor>,
  writer: Mutex<Option<PacketWriter>>,
  shut_down: AtomicBool,
}

impl<P: Packet> Clone for Connection<P> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl<P: Packet> Connection<P> {
  pub fn new(reader: Arc<dyn IReader>, options: WriterOptions) -> Result<Self, WireError> {
    options.validate()?;
    let queue = OutboundQueue::with_capacity(options.queue_capacity);
    let inner = ConnectionInner {
      options,
      queue,
      failure_listeners: Arc::new(ListenerRegistry::new("failure")),
      sent_listeners: Arc::new(ListenerRegistry::new("sent")),
      last_active: Arc::new(LastActive::new()),
      generation: Generation::new(),
      status: Arc::new(ConnectionStatus::new()),
      reader,
      monitor: Arc::new(Monitor::new()),
      writer: Mutex::new(None),
      shut_down: AtomicBool::new(false),
    };
    Ok(Self { inner: Arc::new(inner) })
  }

  fn writer_context(&self) -> WriterContext<P> {
    let inner = &self.inner;
    WriterContext {
      options: inner.options.clone(),
      queue: inner.queue.clone(),
      failure_listeners: inner.failure_listeners.clone(),
      sent_listeners: inner.sent_listeners.clone(),
      last_active: inner.last_active.clone(),
      generation: inner.generation.clone(),
      connection: inner.status.clone(),
      reader: inner.reader.clone(),
      monitor: inner.monitor.clone(),
    }
  }

  // --- Lifecycle ---

  /// Hands `stream` to a new writer task and returns its generation.
  ///
  /// Must be called from within a Tokio runtime. Fails with `InvalidState`
  /// after [`shutdown`](Connection::shutdown) or while the previous writer has
  /// not reached `Stopped`; use [`reconnect`](Connection::reconnect) to replace
  /// a writer that is still alive.
  pub fn start<W: WireStream>(&self, stream: W) -> Result<u64, WireError> {
    if self.inner.shut_down.load(Ordering::Acquire) {
      return Err(WireError::InvalidState("connection is shut down"));
    }
    let mut slot = self.inner.writer.lock();
    if let Some(existing) = slot.as_ref() {
      if existing.state() != WriterState::Stopped {
        tracing::debug!(generation = existing.generation(), "start() refused: writer still active");
        return Err(WireError::InvalidState("a packet writer is already active"));
      }
    }
    let generation = self.inner.generation.advance();
    self.inner.status.reset();
    *slot = Some(PacketWriter::spawn(self.writer_context(), generation, stream));
    tracing::info!(generation, "Connection started");
    Ok(generation)
  }

  /// Replaces the current writer (if any) with one writing to `stream`.
  ///
  /// The old writer is superseded: it stops without draining and releases its
  /// transport, and its write failures are no longer escalated. Queued packets
  /// are written by the new writer.
  pub fn reconnect<W: WireStream>(&self, stream: W) -> Result<u64, WireError> {
    if self.inner.shut_down.load(Ordering::Acquire) {
      return Err(WireError::InvalidState("connection is shut down"));
    }
    let mut slot = self.inner.writer.lock();
    // Supersede first: once the status is reset, the old loop must already be stale.
    let generation = self.inner.generation.advance();
    self.inner.status.reset();
    let writer = PacketWriter::spawn(self.writer_context(), generation, stream);
    if let Some(old) = slot.replace(writer) {
      tracing::debug!(old = old.generation(), new = generation, "Superseding packet writer");
      old.request_stop();
    }
    tracing::info!(generation, "Connection reconnected");
    Ok(generation)
  }

  /// Stops the connection permanently.
  ///
  /// Closes the queue, waits for the writer to drain what is still queued and
  /// release its transport, then marks the transport closed. Packets left with
  /// no writer to drain them are reported to the failure listeners, after which
  /// every listener is unregistered. Calling it again is a no-op.
  pub async fn shutdown(&self) -> Result<(), WireError> {
    if self.inner.shut_down.swap(true, Ordering::AcqRel) {
      return Ok(());
    }
    tracing::info!(generation = self.inner.generation.current(), "Connection shutting down");
    self.inner.queue.close();

    let writer = self.inner.writer.lock().take();
    let result = match writer {
      Some(writer) => writer.stop().await,
      None => Ok(()),
    };

    // Whatever no writer drained (none started, or the last one already stopped) is lost.
    let leftovers = self.inner.queue.drain_all();
    if !leftovers.is_empty() {
      tracing::debug!(count = leftovers.len(), "No writer left to drain; reporting queued packets as lost");
    }
    for packet in leftovers {
      self.inner.failure_listeners.notify(&packet);
    }
    // Nothing can be reported any more; drop listeners that may hold this connection.
    self.inner.failure_listeners.clear();
    self.inner.sent_listeners.clear();

    self.inner.status.mark_closed();
    tracing::info!("Connection shut down");
    result
  }

  /// Reports the transport as closed, typically from the reader's teardown path.
  ///
  /// The current writer stops and no further failures are escalated until the
  /// next `start`/`reconnect`. Returns `true` if this call changed the flag.
  pub fn mark_transport_closed(&self) -> bool {
    let changed = self.inner.status.mark_closed();
    if let Some(writer) = self.inner.writer.lock().as_ref() {
      writer.request_stop();
    }
    changed
  }

  // --- Sending ---

  /// Queues `packet` for the writer, waiting for space on a bounded queue.
  pub async fn send(&self, packet: P) -> Result<(), WireError> {
    self.inner.queue.enqueue(packet).await
  }

  /// Queues `packet` without waiting. `ResourceLimitReached` if a bounded queue is full.
  pub fn try_send(&self, packet: P) -> Result<(), WireError> {
    self.inner.queue.try_enqueue(packet)
  }

  // --- Listeners ---

  pub fn add_failure_listener(
    &self,
    listener: Option<Arc<dyn PacketListener<P>>>,
    filter: Option<Arc<dyn PacketFilter<P>>>,
  ) -> Result<(), WireError> {
    self.inner.failure_listeners.register(listener, filter)
  }

  pub fn remove_failure_listener(&self, listener: &Arc<dyn PacketListener<P>>) -> bool {
    self.inner.failure_listeners.unregister(listener)
  }

  pub fn add_sent_listener(
    &self,
    listener: Option<Arc<dyn PacketListener<P>>>,
    filter: Option<Arc<dyn PacketFilter<P>>>,
  ) -> Result<(), WireError> {
    self.inner.sent_listeners.register(listener, filter)
  }

  pub fn remove_sent_listener(&self, listener: &Arc<dyn PacketListener<P>>) -> bool {
    self.inner.sent_listeners.unregister(listener)
  }

  // --- Observation ---

  /// Wall-clock time of the last successful write (packet, header, footer or keep-alive).
  pub fn last_active(&self) -> SystemTime {
    self.inner.last_active.get()
  }

  pub fn idle_for(&self) -> Duration {
    self.inner.last_active.idle_for()
  }

  /// State of the current writer, `None` if none was started.
  pub fn writer_state(&self) -> Option<WriterState> {
    self.inner.writer.lock().as_ref().map(|w| w.state())
  }

  /// Generation of the most recently started writer (0 before the first start).
  pub fn generation(&self) -> u64 {
    self.inner.generation.current()
  }

  /// Number of packets waiting in the outbound queue.
  pub fn pending(&self) -> usize {
    self.inner.queue.len()
  }

  pub fn is_shut_down(&self) -> bool {
    self.inner.shut_down.load(Ordering::Acquire)
  }

  /// Attaches a monitor channel, replacing any previous one.
  pub fn monitor(&self) -> MonitorReceiver {
    self.inner.monitor.attach(self.inner.options.monitor_capacity)
  }
}

impl<P: Packet> IConnection for Connection<P> {
  fn is_transport_closed(&self) -> bool {
    self.inner.status.is_transport_closed()
  }
}

impl<P: Packet> fmt::Debug for Connection<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Connection")
      .field("generation", &self.inner.generation.current())
      .field("writer", &*self.inner.writer.lock())
      .field("pending", &self.inner.queue.len())
      .field("transport_closed", &self.inner.status.is_transport_closed())
      .field("shut_down", &self.inner.shut_down.load(Ordering::Relaxed))
      .finish()
  }
}

impl<P: Packet> Drop for ConnectionInner<P> {
  fn drop(&mut self) {
    // The writer task keeps running on its own clones; let it drain and exit.
    self.queue.close();
    if let Some(writer) = self.writer.get_mut().take() {
      writer.request_stop();
    }
  }
}
