//! Integration tests for the session lifecycle: Open → Closing → Freed.
//!
//! # Purpose
//!
//! These tests drive [`RdpClient`] through its public API with the mock
//! engine and verify that host misuse can never reach freed memory:
//!
//! - `close` is idempotent and `free` works with or without a prior `close`.
//! - Every operation on a freed handle fails the generation check, even
//!   after its arena slot has been reused by a newer session.
//! - Once `close` and `free` complete, the engine's simulated resources are
//!   all released.
//!
//! All tests are plain `#[test]` functions: the client owns its own tokio
//! runtime and blocks the calling thread, exactly as a host thread would.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rdp_client::infrastructure::engine::mock::MockConnector;
use rdp_client::{ClientConfig, ClientError, ErrorKind, LifecycleState, RdpClient, SessionHandle};
use rdp_core::{BitmapTile, KeyboardEvent};

fn client_with(connector: MockConnector) -> RdpClient {
    RdpClient::new(&ClientConfig::default(), Arc::new(connector)).expect("client")
}

fn open(client: &RdpClient) -> SessionHandle {
    client
        .connect("10.0.0.5:3389", "alice", "s3cret", 1024, 768)
        .expect("connect")
}

fn key() -> KeyboardEvent {
    KeyboardEvent::new(0x1E, true)
}

// ── close ─────────────────────────────────────────────────────────────────────

#[test]
fn test_connect_yields_open_session() {
    // Arrange
    let client = client_with(MockConnector::new());

    // Act
    let handle = open(&client);

    // Assert
    assert_eq!(client.state(handle), LifecycleState::Open);
    assert_eq!(client.session_count(), 1);
    assert_ne!(handle.to_raw(), 0);
}

#[test]
fn test_close_twice_succeeds_and_shuts_engine_down_once() {
    // Arrange
    let connector = MockConnector::new();
    let probe = connector.probe();
    let client = client_with(connector);
    let handle = open(&client);

    // Act
    let first = client.close(handle);
    let second = client.close(handle);

    // Assert
    assert_eq!(first, Ok(()));
    assert_eq!(second, Ok(()));
    assert_eq!(client.state(handle), LifecycleState::Closing);
    assert_eq!(probe.shutdown_count(), 1);
    assert_eq!(probe.live_resources(), 0);
}

#[test]
fn test_input_after_close_is_transport_error() {
    let client = client_with(MockConnector::new());
    let handle = open(&client);
    client.close(handle).unwrap();

    let err = client.write_keyboard(handle, key()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[test]
fn test_stream_after_close_is_usage_error() {
    // Arrange
    let client = client_with(MockConnector::new());
    let handle = open(&client);
    client.close(handle).unwrap();
    let sink = |_: i64, _: &BitmapTile| -> Result<(), rdp_client::SinkError> { Ok(()) };

    // Act
    let err = client.stream_output(handle, 1, &sink).unwrap_err();

    // Assert
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn test_close_with_hung_engine_shutdown_still_returns_and_releases_engine() {
    // Arrange: shutdown would stall for 30 s against a 50 ms budget.
    let config = ClientConfig {
        input_timeout_ms: 50,
        ..ClientConfig::default()
    };
    let connector = MockConnector::new().with_shutdown_delay(Duration::from_secs(30));
    let probe = connector.probe();
    let client = RdpClient::new(&config, Arc::new(connector)).expect("client");
    let handle = open(&client);

    // Act
    let started = Instant::now();
    let closed = client.close(handle);
    let elapsed = started.elapsed();

    // Assert
    assert_eq!(closed, Ok(()));
    assert!(elapsed < Duration::from_secs(5), "close took {elapsed:?}");
    assert_eq!(client.state(handle), LifecycleState::Closing);
    assert_eq!(probe.live_resources(), 0);
    assert_eq!(client.write_keyboard(handle, key()).unwrap_err().kind(), ErrorKind::Transport);
    assert_eq!(client.close(handle), Ok(()));
    client.free(handle);
    assert_eq!(client.session_count(), 0);
}

// ── free ──────────────────────────────────────────────────────────────────────

#[test]
fn test_free_without_close_closes_first_and_releases_everything() {
    // Arrange
    let connector = MockConnector::new();
    let probe = connector.probe();
    let client = client_with(connector);
    let handle = open(&client);

    // Act
    client.free(handle);

    // Assert
    assert_eq!(client.state(handle), LifecycleState::Freed);
    assert_eq!(client.session_count(), 0);
    assert_eq!(probe.shutdown_count(), 1);
    assert_eq!(probe.live_resources(), 0);
}

#[test]
fn test_double_free_is_noop() {
    let connector = MockConnector::new();
    let probe = connector.probe();
    let client = client_with(connector);
    let handle = open(&client);
    client.close(handle).unwrap();

    client.free(handle);
    client.free(handle);

    assert_eq!(client.session_count(), 0);
    assert_eq!(probe.shutdown_count(), 1);
}

#[test]
fn test_every_operation_on_freed_handle_fails() {
    // Arrange
    let client = client_with(MockConnector::new());
    let handle = open(&client);
    client.free(handle);
    let sink = |_: i64, _: &BitmapTile| -> Result<(), rdp_client::SinkError> { Ok(()) };

    // Act / Assert
    assert_eq!(client.close(handle), Err(ClientError::stale_handle()));
    assert_eq!(client.write_keyboard(handle, key()), Err(ClientError::stale_handle()));
    assert_eq!(client.stream_output(handle, 1, &sink), Err(ClientError::stale_handle()));
    assert_eq!(client.state(handle), LifecycleState::Freed);
}

#[test]
fn test_freed_handle_stays_dead_after_slot_reuse() {
    // Arrange: free a session so its slot is recycled by the next connect.
    let connector = MockConnector::new();
    let probe = connector.probe();
    let client = client_with(connector);
    let old = open(&client);
    client.free(old);

    // Act
    let new = open(&client);

    // Assert: same slot, new generation, and the old handle cannot reach it.
    assert_eq!(new.index(), old.index());
    assert_ne!(new.generation(), old.generation());
    assert_eq!(client.write_keyboard(old, key()), Err(ClientError::stale_handle()));
    assert_eq!(client.close(old), Err(ClientError::stale_handle()));
    client.free(old);
    assert_eq!(client.state(new), LifecycleState::Open);
    client.write_keyboard(new, key()).expect("new session still usable");
    assert_eq!(probe.inputs().len(), 1);
}

#[test]
fn test_forged_handle_is_rejected() {
    let client = client_with(MockConnector::new());
    let _live = open(&client);

    let forged = SessionHandle::from_raw(7u64 << 32).expect("non-zero generation");

    assert_eq!(client.close(forged), Err(ClientError::stale_handle()));
    assert_eq!(SessionHandle::from_raw(0), None);
}

#[test]
fn test_sessions_are_independent() {
    // Arrange
    let connector = MockConnector::new();
    let probe = connector.probe();
    let client = client_with(connector);
    let a = open(&client);
    let b = open(&client);

    // Act
    client.free(a);

    // Assert
    assert_eq!(client.state(b), LifecycleState::Open);
    assert_eq!(probe.live_resources(), 1);
    client.write_keyboard(b, key()).expect("b unaffected by freeing a");
}
