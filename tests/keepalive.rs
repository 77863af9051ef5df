// tests/keepalive.rs

use rwire::{Msg, WireError, WriterEvent};
use tokio_test::{assert_err, assert_ok};
use std::time::Duration;
mod common;

use common::{test_connection, test_options, wait_for_monitor_event, wait_until, MockTransport};
use common::LONG_TIMEOUT;

// --- Test: An idle transport gets keep-alive payloads ---
#[tokio::test]
async fn test_keepalive_written_when_idle() -> anyhow::Result<()> {
  let options = test_options().with_keepalive(Duration::from_millis(40));
  let (conn, reader) = test_connection(options);
  let monitor = conn.monitor();
  let transport = MockTransport::new();
  let generation = conn.start(transport.clone())?;

  let event = wait_for_monitor_event(&monitor, LONG_TIMEOUT, |e| matches!(e, WriterEvent::KeepAliveSent { .. })).await;
  assert_eq!(event, Ok(WriterEvent::KeepAliveSent { generation }));
  assert!(transport.frame_strings().iter().all(|f| f == " "));
  assert!(conn.idle_for() < Duration::from_millis(500));
  assert_eq!(reader.error_count(), 0);

  conn.shutdown().await?;
  let frames_at_shutdown = transport.frames().len();
  tokio::time::sleep(Duration::from_millis(120)).await;
  assert_eq!(transport.frames().len(), frames_at_shutdown, "no keep-alive after shutdown");
  Ok(())
}

// --- Test: Keep-alives never split or replace packet frames ---
#[tokio::test]
async fn test_keepalive_interleaves_whole_frames() -> anyhow::Result<()> {
  let options = test_options()
    .with_keepalive(Duration::from_millis(30))
    .with_keepalive_payload(&b"<ping/>"[..]);
  let (conn, _reader) = test_connection(options);
  let transport = MockTransport::new();
  conn.start(transport.clone())?;

  for i in 0..5 {
    conn.send(Msg::from_vec(format!("<m{}/>", i).into_bytes())).await?;
    tokio::time::sleep(Duration::from_millis(35)).await;
  }
  assert!(wait_until(LONG_TIMEOUT, || {
    transport.frame_strings().iter().filter(|f| f.starts_with("<m")).count() == 5
  })
  .await);
  conn.shutdown().await?;

  let frames = transport.frame_strings();
  let packets: Vec<&String> = frames.iter().filter(|f| *f != "<ping/>").collect();
  assert_eq!(packets, vec!["<m0/>", "<m1/>", "<m2/>", "<m3/>", "<m4/>"]);
  Ok(())
}

// --- Test: A busy writer suppresses keep-alives ---
#[tokio::test]
async fn test_no_keepalive_while_busy() -> Result<(), WireError> {
  let options = test_options().with_keepalive(Duration::from_millis(200));
  let (conn, _reader) = test_connection(options);
  let transport = MockTransport::new();
  conn.start(transport.clone())?;

  for _ in 0..15 {
    conn.send(Msg::from("<busy/>")).await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  conn.shutdown().await?;

  assert!(transport.frame_strings().iter().all(|f| f == "<busy/>"));
  assert_eq!(transport.frames().len(), 15);
  Ok(())
}

// --- Test: Invalid keep-alive configuration is rejected up front ---
#[tokio::test]
async fn test_invalid_keepalive_options_rejected() {
  common::setup_tracing();
  let reader = common::MockReader::new();
  let zero = test_options().with_keepalive(Duration::ZERO);
  let err = assert_err!(rwire::Connection::<Msg>::new(reader.clone(), zero));
  assert!(matches!(err, WireError::InvalidArgument(_)));
  let empty_payload = test_options()
    .with_keepalive(Duration::from_millis(10))
    .with_keepalive_payload(Vec::<u8>::new());
  let err = assert_err!(rwire::Connection::<Msg>::new(reader.clone(), empty_payload));
  assert!(matches!(err, WireError::InvalidArgument(_)));
  assert_ok!(rwire::Connection::<Msg>::new(reader, test_options().with_keepalive(Duration::from_millis(10))));
}
