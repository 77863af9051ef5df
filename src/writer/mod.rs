// src/writer/mod.rs

//! The packet writer: a dedicated task that drains the outbound queue onto the transport.

pub(crate) mod core;
pub mod events;
pub(crate) mod keepalive;
pub mod options;

pub use events::{MonitorReceiver, MonitorSender, WriterEvent, DEFAULT_MONITOR_CAPACITY};
pub use options::WriterOptions;

use crate::connection::{IConnection, IReader};
use crate::error::WireError;
use crate::listener::ListenerRegistry;
use crate::message::Packet;
use crate::runtime::{Generation, LastActive, OutboundQueue, StateCell, WriterState};
use crate::transport::{SharedTransport, WireStream};
use crate::writer::core::WriterLoop;
use crate::writer::events::Monitor;
use crate::writer::keepalive::KeepAlive;

use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Everything a writer loop shares with its connection.
pub(crate) struct WriterContext<P> {
  pub options: WriterOptions,
  pub queue: OutboundQueue<P>,
  pub failure_listeners: Arc<ListenerRegistry<P>>,
  pub sent_listeners: Arc<ListenerRegistry<P>>,
  pub last_active: Arc<LastActive>,
  pub generation: Generation,
  pub connection: Arc<dyn IConnection>,
  pub reader: Arc<dyn IReader>,
  pub monitor: Arc<Monitor>,
}

// Manual impl: deriving would require `P: Clone`.
impl<P> Clone for WriterContext<P> {
  fn clone(&self) -> Self {
    Self {
      options: self.options.clone(),
      queue: self.queue.clone(),
      failure_listeners: self.failure_listeners.clone(),
      sent_listeners: self.sent_listeners.clone(),
      last_active: self.last_active.clone(),
      generation: self.generation.clone(),
      connection: self.connection.clone(),
      reader: self.reader.clone(),
      monitor: self.monitor.clone(),
    }
  }
}

/// Handle to one spawned writer loop (and its keep-alive task, if enabled).
pub(crate) struct PacketWriter {
  generation: u64,
  state: Arc<StateCell>,
  stop_signal: Arc<Notify>,
  task: Option<JoinHandle<()>>,
  keepalive_task: Option<JoinHandle<()>>,
}

impl PacketWriter {
  /// Takes ownership of `stream` and spawns the writer loop on the current Tokio runtime.
  ///
  /// `generation` must already have been advanced on `ctx.generation`, so any
  /// loop still running for the same connection is superseded and exits.
  pub(crate) fn spawn<P: Packet, W: WireStream>(ctx: WriterContext<P>, generation: u64, stream: W) -> Self {
    let state = Arc::new(StateCell::new());
    let stop_signal = Arc::new(Notify::new());
    let transport = SharedTransport::new(stream);

    let keepalive_task = ctx.options.keepalive_interval.map(|interval| {
      let keepalive = KeepAlive {
        generation,
        interval,
        payload: ctx.options.keepalive_payload.clone(),
        transport: transport.clone(),
        state: state.clone(),
        connection_generation: ctx.generation.clone(),
        last_active: ctx.last_active.clone(),
        monitor: ctx.monitor.clone(),
      };
      tokio::spawn(keepalive.run_loop())
    });

    let writer_loop = WriterLoop::new(generation, ctx, state.clone(), stop_signal.clone(), transport);
    let task = tokio::spawn(writer_loop.run_loop());
    tracing::debug!(generation, "Spawned packet writer");

    Self {
      generation,
      state,
      stop_signal,
      task: Some(task),
      keepalive_task,
    }
  }

  pub(crate) fn generation(&self) -> u64 {
    self.generation
  }

  pub(crate) fn state(&self) -> WriterState {
    self.state.get()
  }

  /// Asks the loop to leave its main cycle and drain. Returns `true` if this call moved it out of `Running`.
  pub(crate) fn request_stop(&self) -> bool {
    let transitioned = self.state.begin_stopping();
    // notify_one stores a permit, so a loop not yet waiting still sees it.
    self.stop_signal.notify_one();
    transitioned
  }

  /// Requests a stop and waits until the loop has drained and released its transport.
  pub(crate) async fn stop(mut self) -> Result<(), WireError> {
    self.request_stop();
    self.join().await
  }

  /// Waits for the loop to exit on its own.
  pub(crate) async fn join(&mut self) -> Result<(), WireError> {
    let result = match self.task.take() {
      Some(task) => task.await.map_err(|e| {
        tracing::error!(generation = self.generation, "Error joining writer task: {:?}", e);
        WireError::Internal(format!("writer task failed: {}", e))
      }),
      None => Ok(()),
    };
    if let Some(keepalive) = self.keepalive_task.take() {
      keepalive.abort();
    }
    result
  }
}

impl fmt::Debug for PacketWriter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PacketWriter")
      .field("generation", &self.generation)
      .field("state", &self.state.get())
      .field("keepalive", &self.keepalive_task.is_some())
      .finish()
  }
}
