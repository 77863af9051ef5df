// src/writer/core.rs

use crate::error::WireError;
use crate::message::Packet;
use crate::runtime::StateCell;
use crate::transport::{SharedTransport, TransportGuard, WireStream};
use crate::writer::events::WriterEvent;
use crate::writer::WriterContext;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Notify;

/// Where a write attempt happened. Escalation rules differ between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  Main,
  Drain,
}

/// The writer loop for one generation of a connection.
///
/// Owns the queue consumer side for as long as its generation is current.
/// Write failures never leave this type: they are reported to failure
/// listeners and escalated to the reader at most once.
pub(crate) struct WriterLoop<P, W> {
  generation: u64,
  ctx: WriterContext<P>,
  state: Arc<StateCell>,
  stop_signal: Arc<Notify>,
  transport: SharedTransport<W>,
  escalated: bool,
  written: usize,
  failed: usize,
}

impl<P, W> fmt::Debug for WriterLoop<P, W> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WriterLoop")
      .field("generation", &self.generation)
      .field("state", &self.state.get())
      .field("escalated", &self.escalated)
      .field("written", &self.written)
      .field("failed", &self.failed)
      .finish_non_exhaustive()
  }
}

impl<P: Packet, W: WireStream> WriterLoop<P, W> {
  pub(crate) fn new(
    generation: u64,
    ctx: WriterContext<P>,
    state: Arc<StateCell>,
    stop_signal: Arc<Notify>,
    transport: SharedTransport<W>,
  ) -> Self {
    Self {
      generation,
      ctx,
      state,
      stop_signal,
      transport,
      escalated: false,
      written: 0,
      failed: 0,
    }
  }

  /// Runs the writer until it is stopped, fails fatally, or is superseded.
  pub(crate) async fn run_loop(mut self) {
    let generation = self.generation;
    tracing::info!(generation, "Packet writer started");
    self.ctx.monitor.emit(WriterEvent::Started { generation });

    // Phase 1: Stream header
    if let Some(header) = self.ctx.options.stream_header.clone() {
      match self.transport.write_frame(&header).await {
        Ok(()) => {
          self.ctx.last_active.touch();
          tracing::debug!(generation, header_len = header.len(), "Wrote stream header");
        }
        Err(e) => {
          tracing::error!(generation, error = %e, "Failed to write stream header");
          self.escalate(e, Phase::Main);
        }
      }
    }

    // Phase 2: Main cycle
    let superseded = self.main_cycle().await;

    // Phase 3: Drain and release
    if superseded {
      tracing::info!(generation, "Packet writer superseded by a newer generation; leaving queue to it");
      self.transport.release().await;
    } else {
      self.drain_and_release().await;
    }

    self.state.set_stopped();
    tracing::info!(
      generation,
      written = self.written,
      failed = self.failed,
      escalated = self.escalated,
      "Packet writer stopped"
    );
    self.ctx.monitor.emit(WriterEvent::Stopped { generation });
  }

  /// Dequeues and writes packets while `Running`. Returns `true` if the loop was superseded.
  async fn main_cycle(&mut self) -> bool {
    let generation = self.generation;
    let poll_interval = self.ctx.options.poll_interval;

    loop {
      if !self.ctx.generation.is_current(generation) {
        self.state.begin_stopping();
        return true;
      }
      if !self.state.is_running() {
        tracing::debug!(generation, "Stop requested, leaving main cycle");
        return false;
      }
      if self.ctx.connection.is_transport_closed() {
        tracing::debug!(generation, "Transport reported closed, leaving main cycle");
        self.state.begin_stopping();
        return false;
      }
      if self.ctx.queue.is_closed() && self.ctx.queue.is_empty() {
        tracing::debug!(generation, "Outbound queue closed, leaving main cycle");
        self.state.begin_stopping();
        return false;
      }

      let next = tokio::select! {
        biased; // A stop request wins over a ready packet
        _ = self.stop_signal.notified() => continue,
        packet = self.ctx.queue.dequeue_timeout(poll_interval) => packet,
      };
      let Some(packet) = next else {
        continue; // Timed out, re-check stop conditions
      };

      // Serialize + write + flush under one lock; listeners run after it is released.
      let result = {
        let mut guard = self.transport.lock().await;
        guard.write_frame(&packet.to_bytes()).await
      };
      self.settle(packet, result, Phase::Main);
    }
  }

  /// Writes every packet still queued, then the optional footer, then releases the transport.
  async fn drain_and_release(&mut self) {
    let generation = self.generation;
    let transport = self.transport.clone();
    let mut guard = transport.lock().await;

    // A newer writer may have taken over while we waited for the lock.
    let pending = if self.ctx.generation.is_current(generation) {
      self.ctx.queue.drain_all()
    } else {
      Vec::new()
    };
    let (written_before, failed_before) = (self.written, self.failed);
    if !pending.is_empty() {
      tracing::debug!(generation, pending = pending.len(), "Draining queued packets");
    }
    for packet in pending {
      let result = guard.write_frame(&packet.to_bytes()).await;
      self.settle(packet, result, Phase::Drain);
    }
    let written = self.written - written_before;
    let failed = self.failed - failed_before;

    self.write_footer(&mut guard).await;

    if guard.release().await {
      tracing::debug!(generation, "Transport released");
    }
    drop(guard);

    tracing::debug!(generation, written, failed, "Drain complete");
    self.ctx.monitor.emit(WriterEvent::Drained {
      generation,
      written,
      failed,
    });
  }

  /// The footer only follows a clean run on an open transport, by the current generation.
  async fn write_footer(&mut self, guard: &mut TransportGuard<'_, W>) {
    let Some(footer) = self.ctx.options.stream_footer.clone() else {
      return;
    };
    if !self.ctx.generation.is_current(self.generation) {
      tracing::debug!(generation = self.generation, "Superseded writer; skipping stream footer");
      return;
    }
    if self.escalated || self.failed > 0 || self.ctx.connection.is_transport_closed() {
      tracing::debug!(generation = self.generation, "Skipping stream footer after failures");
      return;
    }
    match guard.write_frame(&footer).await {
      Ok(()) => self.ctx.last_active.touch(),
      Err(e) => tracing::debug!(generation = self.generation, error = %e, "Failed to write stream footer"),
    }
  }

  /// Applies the outcome of one write attempt.
  fn settle(&mut self, packet: P, result: Result<(), WireError>, phase: Phase) {
    match result {
      Ok(()) => {
        self.written += 1;
        self.ctx.last_active.touch();
        tracing::trace!(generation = self.generation, packet = ?packet, "Packet written");
        self.ctx.sent_listeners.notify(&packet);
      }
      Err(error) => {
        self.failed += 1;
        tracing::error!(
          generation = self.generation,
          ?phase,
          packet = ?packet,
          error = %error,
          "Failed to write packet; reporting it as lost"
        );
        let notified = self.ctx.failure_listeners.notify(&packet);
        tracing::trace!(generation = self.generation, notified, "Failure listeners notified");
        self.ctx.monitor.emit(WriterEvent::PacketFailed {
          generation: self.generation,
          error_msg: error.to_string(),
        });
        self.escalate(error, phase);
      }
    }
  }

  /// Hands a write failure to the reader as a connection error, at most once.
  ///
  /// Suppressed when the transport is already reported closed, when this loop
  /// has been superseded, or (in the main cycle) when a stop is already underway.
  fn escalate(&mut self, cause: WireError, phase: Phase) {
    let generation = self.generation;
    if self.escalated {
      tracing::debug!(generation, "Connection error already escalated; suppressing");
      return;
    }
    if !self.ctx.generation.is_current(generation) {
      tracing::debug!(generation, "Superseded writer; not escalating");
      return;
    }
    if self.ctx.connection.is_transport_closed() {
      tracing::debug!(generation, "Transport already closed; not escalating");
      return;
    }
    if phase == Phase::Main && !self.state.begin_stopping() {
      tracing::debug!(generation, "Stop already underway; not escalating");
      return;
    }

    self.escalated = true;
    tracing::warn!(generation, error = %cause, "Escalating write failure to reader");
    self.ctx.monitor.emit(WriterEvent::Escalated {
      generation,
      error_msg: cause.to_string(),
    });
    let reader = self.ctx.reader.clone();
    if panic::catch_unwind(AssertUnwindSafe(|| reader.notify_connection_error(cause))).is_err() {
      tracing::error!(generation, "Reader panicked while handling connection error");
    }
  }
}
