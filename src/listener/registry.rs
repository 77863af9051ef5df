// src/listener/registry.rs

use crate::error::WireError;
use crate::listener::filter::PacketFilter;

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Callback invoked with a packet the writer has finished with (sent or lost).
///
/// Runs synchronously on the writer task, so implementations should hand off
/// any slow work instead of doing it inline.
pub trait PacketListener<P>: Send + Sync {
  fn process_packet(&self, packet: &P);
}

impl<P, F> PacketListener<P> for F
where
  F: Fn(&P) + Send + Sync,
{
  fn process_packet(&self, packet: &P) {
    self(packet)
  }
}

struct ListenerEntry<P> {
  listener: Arc<dyn PacketListener<P>>,
  filter: Option<Arc<dyn PacketFilter<P>>>,
}

// Manual impl: deriving would require `P: Clone`.
impl<P> Clone for ListenerEntry<P> {
  fn clone(&self) -> Self {
    Self {
      listener: self.listener.clone(),
      filter: self.filter.clone(),
    }
  }
}

/// Identity of a registered listener: the address of its `Arc` allocation.
fn listener_key<P>(listener: &Arc<dyn PacketListener<P>>) -> usize {
  Arc::as_ptr(listener) as *const () as usize
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
  if let Some(s) = payload.downcast_ref::<&'static str>() {
    s
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.as_str()
  } else {
    "non-string panic payload"
  }
}

/// Set of (listener, filter) pairs keyed by listener identity.
///
/// Registration and removal may happen from any thread while the writer task
/// is notifying. `notify` works on a snapshot taken under a short read lock,
/// so a listener may register or unregister listeners (itself included) from
/// inside its callback. A listener registered concurrently with a notification
/// may miss that one notification but sees every later one.
pub struct ListenerRegistry<P> {
  name: &'static str,
  entries: RwLock<HashMap<usize, ListenerEntry<P>>>,
}

impl<P> ListenerRegistry<P> {
  /// `name` only appears in log output.
  pub fn new(name: &'static str) -> Self {
    Self {
      name,
      entries: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `listener` with an optional `filter`; `None` matches every packet.
  ///
  /// Registering the same `Arc` again replaces its filter. Keep a clone of the
  /// `Arc` around to unregister later.
  pub fn register(
    &self,
    listener: Option<Arc<dyn PacketListener<P>>>,
    filter: Option<Arc<dyn PacketFilter<P>>>,
  ) -> Result<(), WireError> {
    let listener = listener.ok_or_else(|| WireError::InvalidArgument("packet listener must not be absent".into()))?;
    let key = listener_key(&listener);
    let replaced = self
      .entries
      .write()
      .insert(key, ListenerEntry { listener, filter })
      .is_some();
    tracing::trace!(registry = self.name, key, replaced, "Registered packet listener");
    Ok(())
  }

  /// Removes `listener`. Returns whether it was registered.
  pub fn unregister(&self, listener: &Arc<dyn PacketListener<P>>) -> bool {
    let key = listener_key(listener);
    let removed = self.entries.write().remove(&key).is_some();
    if removed {
      tracing::trace!(registry = self.name, key, "Unregistered packet listener");
    }
    removed
  }

  /// Invokes every listener whose filter accepts `packet`, on the calling task.
  ///
  /// A panic raised by a filter or listener is caught and logged; the remaining
  /// listeners still run. Returns how many listeners were invoked (including
  /// ones that panicked after their filter matched).
  pub fn notify(&self, packet: &P) -> usize {
    let snapshot: Vec<ListenerEntry<P>> = {
      let guard = self.entries.read();
      guard.values().cloned().collect()
    };

    let mut invoked = 0;
    for entry in snapshot {
      let mut matched = false;
      let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        matched = entry.filter.as_ref().map_or(true, |f| f.accept(packet));
        if matched {
          entry.listener.process_packet(packet);
        }
      }));
      if matched {
        invoked += 1;
      }
      if let Err(payload) = outcome {
        tracing::warn!(
          registry = self.name,
          panic = panic_message(&*payload),
          "Packet listener panicked; continuing with remaining listeners"
        );
      }
    }
    invoked
  }

  pub fn len(&self) -> usize {
    self.entries.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.read().is_empty()
  }

  pub fn clear(&self) {
    self.entries.write().clear();
  }
}

impl<P> fmt::Debug for ListenerRegistry<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ListenerRegistry")
      .field("name", &self.name)
      .field("listeners", &self.len())
      .finish()
  }
}
