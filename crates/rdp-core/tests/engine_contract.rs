//! Integration tests for the rdp-core public API.
//!
//! These tests drive the engine traits the way the boundary does: through
//! `Box<dyn RdpEngine>` trait objects obtained from an `EngineConnector`.

use std::collections::VecDeque;

use async_trait::async_trait;
use rdp_core::{
    BitmapTile, ConnectionParams, EngineConnector, EngineError, KeyboardEvent, PointerButton,
    PointerEvent, RdpEngine, TileRect,
};

/// Engine that replays a fixed list of batches and then ends the session.
struct ReplayEngine {
    batches: VecDeque<Vec<BitmapTile>>,
    width: u16,
    height: u16,
    closed: bool,
}

#[async_trait]
impl RdpEngine for ReplayEngine {
    async fn next_batch(&mut self) -> Result<Option<Vec<BitmapTile>>, EngineError> {
        if self.closed {
            return Err(EngineError::Closed);
        }
        Ok(self.batches.pop_front())
    }

    async fn write_pointer(&mut self, event: PointerEvent) -> Result<(), EngineError> {
        if event.x >= self.width || event.y >= self.height {
            return Err(EngineError::Rejected(format!("({}, {}) off desktop", event.x, event.y)));
        }
        Ok(())
    }

    async fn write_keyboard(&mut self, _event: KeyboardEvent) -> Result<(), EngineError> {
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), EngineError> {
        self.closed = true;
        Ok(())
    }
}

struct ReplayConnector;

#[async_trait]
impl EngineConnector for ReplayConnector {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn RdpEngine>, EngineError> {
        if params.username() == "mallory" {
            return Err(EngineError::Authentication("unknown user".to_string()));
        }
        let tile = BitmapTile::new(
            TileRect::new(0, 0, 0, 0),
            vec![1, 2, 3, 4],
        );
        Ok(Box::new(ReplayEngine {
            batches: VecDeque::from(vec![vec![tile]]),
            width: params.width(),
            height: params.height(),
            closed: false,
        }))
    }
}

fn params(username: &str) -> ConnectionParams {
    ConnectionParams::new("rdp.example.test:3389", username, "pw", 1024, 768).unwrap()
}

#[tokio::test]
async fn test_connector_returns_engine_that_streams_then_ends() {
    // Arrange
    let mut engine = ReplayConnector.connect(&params("alice")).await.unwrap();

    // Act
    let first = engine.next_batch().await.unwrap();
    let second = engine.next_batch().await.unwrap();

    // Assert
    assert_eq!(first.map(|b| b.len()), Some(1));
    assert!(second.is_none(), "exhausted engine must signal end of session");
}

#[tokio::test]
async fn test_connector_failure_carries_engine_error() {
    let result = ReplayConnector.connect(&params("mallory")).await;
    assert!(matches!(result, Err(EngineError::Authentication(_))));
}

#[tokio::test]
async fn test_engine_rejects_pointer_outside_desktop() {
    // Arrange
    let mut engine = ReplayConnector.connect(&params("alice")).await.unwrap();
    let event = PointerEvent::new(1024, 10, PointerButton::Left, true);

    // Act
    let result = engine.write_pointer(event).await;

    // Assert
    assert!(matches!(result, Err(EngineError::Rejected(_))));
}

#[tokio::test]
async fn test_engine_reports_closed_after_shutdown() {
    let mut engine = ReplayConnector.connect(&params("alice")).await.unwrap();
    engine.shutdown().await.unwrap();
    assert_eq!(engine.next_batch().await, Err(EngineError::Closed));
}

#[test]
fn test_engine_error_messages_are_human_readable() {
    assert_eq!(
        EngineError::Handshake("tls alert".to_string()).to_string(),
        "handshake failed: tls alert"
    );
    assert_eq!(EngineError::Closed.to_string(), "engine is closed");
}
