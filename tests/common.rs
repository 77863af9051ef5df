// tests/common.rs
#![allow(dead_code)] // Not every test file uses every helper

use rwire::{Connection, IReader, Msg, MonitorReceiver, PacketListener, WireError, WriterEvent, WriterOptions};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use parking_lot::Mutex;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::task::{Context, Poll, Waker};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::time::timeout;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(250);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(2);
pub const FAST_POLL: Duration = Duration::from_millis(20);

// Use std::sync::Once for one-time initialization
static TRACING_INIT: Once = Once::new();

// Setup function to initialize tracing
pub fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    // Can be overridden by RUST_LOG env variable
    let default_filter = "rwire=trace,info";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
      .with_max_level(tracing::Level::TRACE)
      .with_env_filter(env_filter)
      .with_target(true)
      .with_line_number(true)
      .with_span_events(FmtSpan::CLOSE)
      .with_test_writer() // Write to test output capture
      .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber");
  });
}

// --- Mock transport ---

#[derive(Default)]
struct MockState {
  frames: Vec<Vec<u8>>,
  pending: Vec<u8>,
  fail_payloads: Vec<Vec<u8>>,
  fail_after: Option<usize>,
  broken: bool,
  write_attempts: usize,
  shut_down: bool,
  held: bool,
  waker: Option<Waker>,
}

impl MockState {
  fn should_fail(&self, buf: &[u8]) -> bool {
    self.broken
      || self.shut_down
      || self.fail_after.map_or(false, |n| self.frames.len() >= n)
      || self.fail_payloads.iter().any(|p| p.as_slice() == buf)
  }
}

/// In-memory transport recording every flushed frame, with scripted write failures.
///
/// Clones share state, so a test keeps one clone to inspect what the writer
/// (which owns the other) did.
#[derive(Clone, Default)]
pub struct MockTransport {
  state: Arc<Mutex<MockState>>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every write of exactly `payload` fails with `BrokenPipe`; nothing is committed.
  pub fn fail_on(self, payload: &[u8]) -> Self {
    self.state.lock().fail_payloads.push(payload.to_vec());
    self
  }

  /// Once `n` frames have been committed, every further write fails.
  pub fn fail_after(self, n: usize) -> Self {
    self.state.lock().fail_after = Some(n);
    self
  }

  /// Makes every write from now on fail.
  pub fn break_now(&self) {
    self.state.lock().broken = true;
  }

  /// Parks every write until [`release_hold`](Self::release_hold) is called.
  pub fn hold(&self) {
    self.state.lock().held = true;
  }

  pub fn release_hold(&self) {
    let waker = {
      let mut state = self.state.lock();
      state.held = false;
      state.waker.take()
    };
    if let Some(waker) = waker {
      waker.wake();
    }
  }

  pub fn frames(&self) -> Vec<Vec<u8>> {
    self.state.lock().frames.clone()
  }

  pub fn frame_strings(&self) -> Vec<String> {
    self
      .frames()
      .into_iter()
      .map(|f| String::from_utf8_lossy(&f).into_owned())
      .collect()
  }

  pub fn write_attempts(&self) -> usize {
    self.state.lock().write_attempts
  }

  pub fn is_shut_down(&self) -> bool {
    self.state.lock().shut_down
  }
}

impl AsyncWrite for MockTransport {
  fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
    let mut state = self.state.lock();
    state.write_attempts += 1;
    if state.held {
      state.waker = Some(cx.waker().clone());
      return Poll::Pending;
    }
    if state.should_fail(buf) {
      return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure")));
    }
    state.pending.extend_from_slice(buf);
    Poll::Ready(Ok(buf.len()))
  }

  fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
    let mut state = self.state.lock();
    if !state.pending.is_empty() {
      let frame = std::mem::take(&mut state.pending);
      state.frames.push(frame);
    }
    Poll::Ready(Ok(()))
  }

  fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
    let mut state = self.state.lock();
    if !state.pending.is_empty() {
      let frame = std::mem::take(&mut state.pending);
      state.frames.push(frame);
    }
    state.shut_down = true;
    Poll::Ready(Ok(()))
  }
}

// --- Mock reader ---

/// Records every connection error the writer escalates.
#[derive(Default)]
pub struct MockReader {
  errors: Mutex<Vec<String>>,
  panic_on_error: AtomicBool,
}

impl MockReader {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn panicking() -> Arc<Self> {
    let reader = Self::default();
    reader.panic_on_error.store(true, Ordering::SeqCst);
    Arc::new(reader)
  }

  pub fn errors(&self) -> Vec<String> {
    self.errors.lock().clone()
  }

  pub fn error_count(&self) -> usize {
    self.errors.lock().len()
  }
}

impl IReader for MockReader {
  fn notify_connection_error(&self, cause: WireError) {
    self.errors.lock().push(cause.to_string());
    if self.panic_on_error.load(Ordering::SeqCst) {
      panic!("reader exploded");
    }
  }
}

// --- Listeners ---

/// A listener recording the payload of every packet it sees.
pub struct Recorder {
  seen: Mutex<Vec<String>>,
}

impl Recorder {
  pub fn new() -> Arc<Self> {
    Arc::new(Self { seen: Mutex::new(Vec::new()) })
  }

  pub fn seen(&self) -> Vec<String> {
    self.seen.lock().clone()
  }

  pub fn count(&self) -> usize {
    self.seen.lock().len()
  }
}

impl PacketListener<Msg> for Recorder {
  fn process_packet(&self, packet: &Msg) {
    self.seen.lock().push(String::from_utf8_lossy(packet.data()).into_owned());
  }
}

/// Coerces a recorder into the listener handle used for registration and removal.
pub fn as_listener(recorder: &Arc<Recorder>) -> Arc<dyn PacketListener<Msg>> {
  recorder.clone()
}

// --- Setup helpers ---

pub fn test_options() -> WriterOptions {
  WriterOptions::new().with_poll_interval(FAST_POLL)
}

/// Builds a connection with fast polling and a recording reader.
pub fn test_connection(options: WriterOptions) -> (Connection<Msg>, Arc<MockReader>) {
  setup_tracing();
  let reader = MockReader::new();
  let conn = Connection::new(reader.clone(), options).expect("Failed to create test connection");
  (conn, reader)
}

// --- Wait helpers ---

/// Polls `cond` until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, cond: impl Fn() -> bool) -> bool {
  let start = tokio::time::Instant::now();
  while start.elapsed() < limit {
    if cond() {
      return true;
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
  }
  cond()
}

// --- Helper function to wait for specific monitor event ---
pub async fn wait_for_monitor_event(
  monitor_rx: &MonitorReceiver,
  limit: Duration,
  check_event: impl Fn(&WriterEvent) -> bool,
) -> Result<WriterEvent, String> {
  let start_time = tokio::time::Instant::now();
  loop {
    let remaining = limit.saturating_sub(start_time.elapsed());
    if remaining.is_zero() {
      return Err(format!("Timeout waiting for specific monitor event after {:?}", limit));
    }
    match timeout(remaining, monitor_rx.recv()).await {
      Ok(Ok(event)) => {
        println!("Monitor received: {:?}", event);
        if check_event(&event) {
          return Ok(event);
        }
      }
      Ok(Err(_recv_err)) => return Err("Monitor channel closed unexpectedly".to_string()),
      Err(_elapsed) => {} // Loop re-checks the overall limit
    }
  }
}
