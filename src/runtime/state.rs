// src/runtime/state.rs

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of a writer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriterState {
  /// Dequeuing and writing packets.
  Running,
  /// Main cycle has ended; the loop is draining or about to release the transport.
  Stopping,
  /// Terminal. The transport has been released.
  Stopped,
}

impl WriterState {
  fn from_u8(raw: u8) -> Self {
    match raw {
      0 => WriterState::Running,
      1 => WriterState::Stopping,
      _ => WriterState::Stopped,
    }
  }

  fn as_u8(self) -> u8 {
    match self {
      WriterState::Running => 0,
      WriterState::Stopping => 1,
      WriterState::Stopped => 2,
    }
  }
}

/// Atomically readable `WriterState`. Transitions only move forward.
#[derive(Debug)]
pub struct StateCell {
  raw: AtomicU8,
}

impl StateCell {
  pub fn new() -> Self {
    Self {
      raw: AtomicU8::new(WriterState::Running.as_u8()),
    }
  }

  pub fn get(&self) -> WriterState {
    WriterState::from_u8(self.raw.load(Ordering::Acquire))
  }

  pub fn is_running(&self) -> bool {
    self.get() == WriterState::Running
  }

  /// `Running -> Stopping`. Returns `true` only for the caller that performed the transition.
  pub fn begin_stopping(&self) -> bool {
    self
      .raw
      .compare_exchange(
        WriterState::Running.as_u8(),
        WriterState::Stopping.as_u8(),
        Ordering::AcqRel,
        Ordering::Acquire,
      )
      .is_ok()
  }

  pub fn set_stopped(&self) {
    self.raw.store(WriterState::Stopped.as_u8(), Ordering::Release);
  }
}

impl Default for StateCell {
  fn default() -> Self {
    Self::new()
  }
}

/// Connection-wide counter identifying the writer loop that currently owns the queue.
///
/// Every (re)start bumps the counter; a loop whose captured number no longer
/// matches has been superseded and must exit.
#[derive(Debug, Clone, Default)]
pub struct Generation {
  current: Arc<AtomicU64>,
}

impl Generation {
  pub fn new() -> Self {
    Self::default()
  }

  /// Starts a new generation and returns its number.
  pub fn advance(&self) -> u64 {
    self.current.fetch_add(1, Ordering::AcqRel) + 1
  }

  pub fn current(&self) -> u64 {
    self.current.load(Ordering::Acquire)
  }

  pub fn is_current(&self, generation: u64) -> bool {
    self.current() == generation
  }
}
