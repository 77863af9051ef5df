// src/runtime/last_active.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock mark of the last successful write on a connection.
///
/// Stored as milliseconds since the UNIX epoch so it can be read from any
/// thread without locking. Updates never move the mark backwards.
#[derive(Debug)]
pub struct LastActive {
  millis: AtomicU64,
}

fn now_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

impl LastActive {
  /// Starts the mark at the current time.
  pub fn new() -> Self {
    Self {
      millis: AtomicU64::new(now_millis()),
    }
  }

  /// Records activity now.
  pub fn touch(&self) {
    self.millis.fetch_max(now_millis(), Ordering::AcqRel);
  }

  /// Milliseconds since the UNIX epoch of the last recorded activity.
  pub fn as_millis(&self) -> u64 {
    self.millis.load(Ordering::Acquire)
  }

  pub fn get(&self) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(self.as_millis())
  }

  /// Time elapsed since the last recorded activity. Zero if the clock stepped backwards.
  pub fn idle_for(&self) -> Duration {
    Duration::from_millis(now_millis().saturating_sub(self.as_millis()))
  }
}

impl Default for LastActive {
  fn default() -> Self {
    Self::new()
  }
}
