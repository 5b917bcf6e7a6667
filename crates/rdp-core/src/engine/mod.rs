//! Capability traits for the external RDP protocol engine.
//!
//! The boundary never speaks RDP itself.  It drives an engine through two
//! traits:
//!
//! - [`EngineConnector`] performs transport setup and the handshake and, on
//!   success, hands back a connected [`RdpEngine`].
//! - [`RdpEngine`] is one live session: fetch decoded updates, inject input,
//!   terminate.
//!
//! # Ownership
//!
//! A connected engine is exclusively owned by one session handle.  The
//! boundary serialises every call on it, so implementations only need to be
//! `Send`, never `Sync`.
//!
//! # Cancellation
//!
//! The boundary bounds every engine call with a timeout and may drop the
//! returned future before it completes (for example when the host closes
//! the session mid-fetch).  Implementations must be cancel-safe: dropping a
//! pending [`RdpEngine::next_batch`] must not lose or corrupt an update that
//! was only partially read.
//!
//! The same applies to [`EngineConnector::connect`]: if the future is
//! dropped, or returns an error, every socket and buffer it allocated must be
//! released by the time it is gone.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::input::{KeyboardEvent, PointerEvent};
use crate::domain::params::ConnectionParams;
use crate::domain::tile::BitmapTile;

/// Failures reported by an engine.
///
/// The boundary maps these onto its own error taxonomy depending on which
/// operation was running.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Socket-level failure (connect refused, reset, unreachable).
    #[error("network error: {0}")]
    Network(String),

    /// TLS, NLA, or capability negotiation failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The server refused the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Server data could not be decoded or is unsupported.
    #[error("decode error: {0}")]
    Decode(String),

    /// The engine refused an input event.
    #[error("input rejected: {0}")]
    Rejected(String),

    /// The session has already been terminated.
    #[error("engine is closed")]
    Closed,
}

/// One connected RDP session.
#[async_trait]
pub trait RdpEngine: Send {
    /// Waits for the next batch of decoded display updates.
    ///
    /// Returns `Ok(None)` when the server ended the session normally.  The
    /// tiles in a batch are in server emission order.
    async fn next_batch(&mut self) -> Result<Option<Vec<BitmapTile>>, EngineError>;

    /// Injects a pointer event.
    async fn write_pointer(&mut self, event: PointerEvent) -> Result<(), EngineError>;

    /// Injects a keyboard event.
    async fn write_keyboard(&mut self, event: KeyboardEvent) -> Result<(), EngineError>;

    /// Tells the server the session is over and releases transport resources.
    async fn shutdown(&mut self) -> Result<(), EngineError>;
}

/// Opens new engine sessions.
#[async_trait]
pub trait EngineConnector: Send + Sync {
    /// Establishes transport and completes the handshake.
    ///
    /// No retries are expected here; retry policy belongs to the host.
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn RdpEngine>, EngineError>;
}
