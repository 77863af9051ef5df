// src/writer/events.rs

use async_channel::TrySendError;
use parking_lot::Mutex;

/// Significant events in the life of a packet writer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive] // Allow adding more events later
pub enum WriterEvent {
  /// A writer loop took ownership of a transport.
  Started { generation: u64 },
  /// A packet could not be written and was reported to failure listeners.
  PacketFailed { generation: u64, error_msg: String },
  /// A write failure was escalated to the reader as a connection error.
  Escalated { generation: u64, error_msg: String },
  /// The shutdown drain finished.
  Drained { generation: u64, written: usize, failed: usize },
  /// A keep-alive payload was written on an idle transport.
  KeepAliveSent { generation: u64 },
  /// The writer loop released its transport and exited.
  Stopped { generation: u64 },
}

// Type alias for the channel sender used for monitor events
pub type MonitorSender = async_channel::Sender<WriterEvent>;
// Type alias for the channel receiver used for monitor events
pub type MonitorReceiver = async_channel::Receiver<WriterEvent>;

// Default capacity for monitor channel
pub const DEFAULT_MONITOR_CAPACITY: usize = 100;

/// Holds the currently attached monitor channel, if any.
///
/// Events are offered with `try_send`: a full monitor loses events, a closed
/// one is detached. The writer never waits on an observer.
#[derive(Debug, Default)]
pub(crate) struct Monitor {
  sender: Mutex<Option<MonitorSender>>,
}

impl Monitor {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Attaches a fresh channel, replacing any previous one.
  pub(crate) fn attach(&self, capacity: usize) -> MonitorReceiver {
    let (tx, rx) = async_channel::bounded(capacity.max(1));
    *self.sender.lock() = Some(tx);
    rx
  }

  pub(crate) fn emit(&self, event: WriterEvent) {
    let mut guard = self.sender.lock();
    let closed = match guard.as_ref() {
      Some(tx) => match tx.try_send(event) {
        Ok(()) => false,
        Err(TrySendError::Full(event)) => {
          tracing::trace!(?event, "Monitor channel full, dropping event");
          false
        }
        Err(TrySendError::Closed(_)) => true,
      },
      None => false,
    };
    if closed {
      tracing::debug!("Monitor receiver dropped, detaching monitor");
      *guard = None;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn emit_without_monitor_is_noop() {
    Monitor::new().emit(WriterEvent::Started { generation: 1 });
  }

  #[test]
  fn full_monitor_drops_and_closed_monitor_detaches() {
    let monitor = Monitor::new();
    let rx = monitor.attach(1);
    monitor.emit(WriterEvent::Started { generation: 1 });
    monitor.emit(WriterEvent::Stopped { generation: 1 });
    assert_eq!(rx.try_recv().unwrap(), WriterEvent::Started { generation: 1 });
    assert!(rx.try_recv().is_err());

    drop(rx);
    monitor.emit(WriterEvent::Stopped { generation: 1 });
    assert!(monitor.sender.lock().is_none());
  }
}
