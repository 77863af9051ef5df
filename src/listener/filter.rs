// src/listener/filter.rs

use std::fmt;
use std::sync::Arc;

/// Decides whether a listener is interested in a packet.
pub trait PacketFilter<P>: Send + Sync {
  fn accept(&self, packet: &P) -> bool;
}

impl<P, F> PacketFilter<P> for F
where
  F: Fn(&P) -> bool + Send + Sync,
{
  fn accept(&self, packet: &P) -> bool {
    self(packet)
  }
}

/// Matches every packet. Equivalent to registering without a filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl<P> PacketFilter<P> for AcceptAll {
  fn accept(&self, _packet: &P) -> bool {
    true
  }
}

/// Matches when every inner filter matches. An empty `AndFilter` matches everything.
pub struct AndFilter<P> {
  filters: Vec<Arc<dyn PacketFilter<P>>>,
}

impl<P> AndFilter<P> {
  pub fn new() -> Self {
    Self { filters: Vec::new() }
  }

  pub fn with(mut self, filter: Arc<dyn PacketFilter<P>>) -> Self {
    self.filters.push(filter);
    self
  }

  pub fn add(&mut self, filter: Arc<dyn PacketFilter<P>>) {
    self.filters.push(filter);
  }
}

impl<P> Default for AndFilter<P> {
  fn default() -> Self {
    Self::new()
  }
}

impl<P> PacketFilter<P> for AndFilter<P> {
  fn accept(&self, packet: &P) -> bool {
    self.filters.iter().all(|f| f.accept(packet))
  }
}

/// Matches when any inner filter matches. An empty `OrFilter` matches nothing.
pub struct OrFilter<P> {
  filters: Vec<Arc<dyn PacketFilter<P>>>,
}

impl<P> OrFilter<P> {
  pub fn new() -> Self {
    Self { filters: Vec::new() }
  }

  pub fn with(mut self, filter: Arc<dyn PacketFilter<P>>) -> Self {
    self.filters.push(filter);
    self
  }

  pub fn add(&mut self, filter: Arc<dyn PacketFilter<P>>) {
    self.filters.push(filter);
  }
}

impl<P> Default for OrFilter<P> {
  fn default() -> Self {
    Self::new()
  }
}

impl<P> PacketFilter<P> for OrFilter<P> {
  fn accept(&self, packet: &P) -> bool {
    self.filters.iter().any(|f| f.accept(packet))
  }
}

/// Inverts an inner filter.
pub struct NotFilter<P> {
  inner: Arc<dyn PacketFilter<P>>,
}

impl<P> NotFilter<P> {
  pub fn new(inner: Arc<dyn PacketFilter<P>>) -> Self {
    Self { inner }
  }
}

impl<P> PacketFilter<P> for NotFilter<P> {
  fn accept(&self, packet: &P) -> bool {
    !self.inner.accept(packet)
  }
}

impl<P> fmt::Debug for AndFilter<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AndFilter").field("filters", &self.filters.len()).finish()
  }
}

impl<P> fmt::Debug for OrFilter<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OrFilter").field("filters", &self.filters.len()).finish()
  }
}

impl<P> fmt::Debug for NotFilter<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NotFilter").finish_non_exhaustive()
  }
}
