// src/writer/keepalive.rs

use crate::runtime::{Generation, LastActive, StateCell};
use crate::transport::{SharedTransport, WireStream};
use crate::writer::events::{Monitor, WriterEvent};

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Writes a keep-alive payload whenever the transport has been idle for `interval`.
///
/// Shares the transport lock with the writer loop, so a keep-alive never lands
/// in the middle of a packet. Keep-alive failures are not escalated: the next
/// packet write observes the broken transport and reports it.
pub(crate) struct KeepAlive<W> {
  pub generation: u64,
  pub interval: Duration,
  pub payload: Bytes,
  pub transport: SharedTransport<W>,
  pub state: Arc<StateCell>,
  pub connection_generation: Generation,
  pub last_active: Arc<LastActive>,
  pub monitor: Arc<Monitor>,
}

impl<W: WireStream> KeepAlive<W> {
  pub(crate) async fn run_loop(self) {
    let generation = self.generation;
    // Check more often than the interval so an idle period is noticed promptly.
    let check_interval = (self.interval / 2).max(Duration::from_millis(10));
    let mut ticker = interval(check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // First tick completes immediately

    tracing::debug!(generation, interval = ?self.interval, "Keep-alive started");
    loop {
      ticker.tick().await;
      if !self.state.is_running() || !self.connection_generation.is_current(generation) {
        break;
      }
      if self.last_active.idle_for() < self.interval {
        continue;
      }

      match self.transport.write_frame(&self.payload).await {
        Ok(()) => {
          self.last_active.touch();
          tracing::trace!(generation, "Keep-alive sent");
          self.monitor.emit(WriterEvent::KeepAliveSent { generation });
        }
        Err(e) => {
          tracing::debug!(generation, error = %e, "Keep-alive write failed, stopping keep-alive");
          break;
        }
      }
    }
    tracing::debug!(generation, "Keep-alive stopped");
  }
}
