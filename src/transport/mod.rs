// src/transport/mod.rs

//! The shared write half of a connection's transport.

pub mod shared;

pub use shared::{SharedTransport, TransportGuard};

use tokio::io::AsyncWrite;

/// Trait alias for byte streams the writer can own.
pub trait WireStream: AsyncWrite + Unpin + Send + 'static {}

impl<T> WireStream for T where T: AsyncWrite + Unpin + Send + 'static {}
