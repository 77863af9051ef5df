// src/writer/options.rs

use crate::error::WireError;
use crate::runtime::DEFAULT_POLL_INTERVAL;
use crate::writer::events::DEFAULT_MONITOR_CAPACITY;

use bytes::Bytes;
use std::time::Duration;

/// Default keep-alive payload: a single whitespace, ignored by stream parsers.
pub const DEFAULT_KEEPALIVE_PAYLOAD: &[u8] = b" ";

/// Holds validated options for a connection's packet writer.
#[derive(Debug, Clone)]
pub struct WriterOptions {
  /// Maximum queued packets. `None` = unbounded.
  pub queue_capacity: Option<usize>,
  /// How long the writer waits on an empty queue before re-checking whether it should stop.
  pub poll_interval: Duration,
  /// Idle time after which the keep-alive payload is written. `None` disables keep-alives.
  pub keepalive_interval: Option<Duration>,
  pub keepalive_payload: Bytes,
  /// Written once when the writer starts, before any packet.
  pub stream_header: Option<Bytes>,
  /// Written once after a clean drain, before the transport is released.
  pub stream_footer: Option<Bytes>,
  /// Capacity of the channel returned by `Connection::monitor`.
  pub monitor_capacity: usize,
}

impl Default for WriterOptions {
  fn default() -> Self {
    Self {
      queue_capacity: None,
      poll_interval: DEFAULT_POLL_INTERVAL,
      keepalive_interval: None,
      keepalive_payload: Bytes::from_static(DEFAULT_KEEPALIVE_PAYLOAD),
      stream_header: None,
      stream_footer: None,
      monitor_capacity: DEFAULT_MONITOR_CAPACITY,
    }
  }
}

impl WriterOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
    self.queue_capacity = Some(capacity);
    self
  }

  pub fn with_poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }

  pub fn with_keepalive(mut self, interval: Duration) -> Self {
    self.keepalive_interval = Some(interval);
    self
  }

  pub fn with_keepalive_payload(mut self, payload: impl Into<Bytes>) -> Self {
    self.keepalive_payload = payload.into();
    self
  }

  pub fn with_stream_header(mut self, header: impl Into<Bytes>) -> Self {
    self.stream_header = Some(header.into());
    self
  }

  pub fn with_stream_footer(mut self, footer: impl Into<Bytes>) -> Self {
    self.stream_footer = Some(footer.into());
    self
  }

  pub fn with_monitor_capacity(mut self, capacity: usize) -> Self {
    self.monitor_capacity = capacity;
    self
  }

  /// Rejects combinations the writer cannot run with.
  pub fn validate(&self) -> Result<(), WireError> {
    if self.queue_capacity == Some(0) {
      return Err(WireError::InvalidArgument("queue_capacity must be at least 1".into()));
    }
    if self.poll_interval.is_zero() {
      return Err(WireError::InvalidArgument("poll_interval must be non-zero".into()));
    }
    if let Some(ivl) = self.keepalive_interval {
      if ivl.is_zero() {
        return Err(WireError::InvalidArgument("keepalive_interval must be non-zero".into()));
      }
      if self.keepalive_payload.is_empty() {
        return Err(WireError::InvalidArgument("keepalive_payload must not be empty".into()));
      }
    }
    if self.monitor_capacity == 0 {
      return Err(WireError::InvalidArgument("monitor_capacity must be at least 1".into()));
    }
    Ok(())
  }
}
