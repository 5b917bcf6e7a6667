//! StreamOutputUseCase: the Output Streamer.
//!
//! # Two halves joined by a bounded channel
//!
//! ```text
//!  runtime worker                          caller's thread
//!  ──────────────                          ───────────────
//!  pump_tiles()                            run()
//!    lock engine                             rx.recv()
//!    next_batch() (≤ fetch_timeout)   ──>    sink.deliver_tile(ref, &tile)
//!    unlock engine                           ...
//!    tx.send(tile) per tile
//! ```
//!
//! The pump owns the engine timing; the adapter owns the host-callback
//! timing.  A slow host callback fills the channel, which makes the pump wait
//! on `send` *without* holding the engine lock, so input injection keeps
//! flowing while the host catches up.
//!
//! # Ordering
//!
//! One pump, one channel, one consumer: tiles reach the sink in exactly the
//! order the engine emitted them.  Nothing is reordered, merged, or dropped
//! while the stream is healthy.
//!
//! # Termination
//!
//! | Cause                                  | Result                     |
//! |----------------------------------------|----------------------------|
//! | Engine reports end of session          | `Ok(())`                   |
//! | `close` / `free` on the session        | `Ok(())`                   |
//! | Engine decode failure / oversized tile | `Err(Protocol)`            |
//! | Engine transport failure               | `Err(Transport)`           |
//! | Sink returns an error                  | `Err(Callback)`, no retry  |
//! | Caller drops the `run` future          | pump cancelled, slot freed |

use std::sync::Arc;

use rdp_core::BitmapTile;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::error::ClientError;
use crate::application::registry::{SessionHandle, SessionRegistry};
use crate::application::session::Session;
use crate::application::settings::SessionSettings;

/// Failure reported by a [`TileSink`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Receives decoded tiles on behalf of the host.
///
/// The tile is borrowed for the duration of the call only; implementations
/// that need the pixels afterwards must copy them.
pub trait TileSink {
    /// Handles one tile for the stream identified by `correlation_id`.
    fn deliver_tile(&self, correlation_id: i64, tile: &BitmapTile) -> Result<(), SinkError>;
}

impl<F> TileSink for F
where
    F: Fn(i64, &BitmapTile) -> Result<(), SinkError>,
{
    fn deliver_tile(&self, correlation_id: i64, tile: &BitmapTile) -> Result<(), SinkError> {
        self(correlation_id, tile)
    }
}

type TileItem = Result<BitmapTile, ClientError>;

/// Deepest pixel format an RDP engine decodes to (32 bpp).
const MAX_BYTES_PER_PIXEL: u64 = 4;

/// The Output Streamer.
pub struct StreamOutputUseCase {
    registry: Arc<SessionRegistry>,
    settings: SessionSettings,
}

impl StreamOutputUseCase {
    /// Creates the use case over the shared arena.
    pub fn new(registry: Arc<SessionRegistry>, settings: SessionSettings) -> Self {
        Self { registry, settings }
    }

    /// Streams tiles from the session to `sink` until the session ends, is
    /// closed, or fails.
    ///
    /// Must be polled on a multi-threaded runtime: the engine pump runs as a
    /// spawned task while this future drives the sink.
    ///
    /// # Errors
    ///
    /// [`ClientError::Usage`] for a stale handle, a closing session, or a
    /// second concurrent stream; otherwise the error that ended the stream.
    pub async fn run(
        &self,
        handle: SessionHandle,
        correlation_id: i64,
        sink: &dyn TileSink,
    ) -> Result<(), ClientError> {
        let session = self.registry.get(handle).ok_or_else(ClientError::stale_handle)?;
        let _streaming = session.begin_stream()?;

        info!(session = %session.trace_id(), correlation_id, "output stream started");

        // Child token: cancelled by `close`, or by us when the sink fails,
        // without closing the session itself.
        let stop = session.cancellation().child_token();
        // The pump must not outlive this future, even when it is dropped
        // before the stream ends.
        let _pump_guard = stop.clone().drop_guard();
        let (tx, rx) = mpsc::channel(self.settings.tile_channel_capacity.max(1));
        let pump = tokio::spawn(pump_tiles(
            Arc::clone(&session),
            tx,
            stop.clone(),
            self.settings.clone(),
        ));

        let result = drain_to_sink(rx, &stop, correlation_id, sink).await;

        stop.cancel();
        if let Err(e) = pump.await {
            error!(session = %session.trace_id(), "tile pump panicked: {e}");
        }

        match &result {
            Ok(delivered) => info!(
                session = %session.trace_id(),
                correlation_id,
                delivered,
                "output stream finished"
            ),
            Err(e) => warn!(
                session = %session.trace_id(),
                correlation_id,
                "output stream failed: {e}"
            ),
        }
        result.map(|_| ())
    }
}

/// Feeds channel items to the sink.  Returns the number of tiles delivered.
async fn drain_to_sink(
    mut rx: mpsc::Receiver<TileItem>,
    stop: &CancellationToken,
    correlation_id: i64,
    sink: &dyn TileSink,
) -> Result<u64, ClientError> {
    let mut delivered = 0u64;
    loop {
        let item = tokio::select! {
            biased;
            _ = stop.cancelled() => return Ok(delivered),
            item = rx.recv() => item,
        };
        match item {
            Some(Ok(tile)) => {
                sink.deliver_tile(correlation_id, &tile)
                    .map_err(|e| ClientError::Callback(e.0))?;
                delivered += 1;
            }
            Some(Err(e)) => return Err(e),
            None => return Ok(delivered),
        }
    }
}

enum Fetch {
    Batch(Vec<BitmapTile>),
    Idle,
    Ended,
    Failed(ClientError),
}

/// Pulls batches from the engine and forwards them tile by tile.
///
/// Exits when `stop` fires, the engine ends, the receiver is gone, or after
/// forwarding the first error.
async fn pump_tiles(
    session: Arc<Session>,
    tx: mpsc::Sender<TileItem>,
    stop: CancellationToken,
    settings: SessionSettings,
) {
    loop {
        let fetched = tokio::select! {
            biased;
            _ = stop.cancelled() => return,
            fetched = fetch_batch(&session, &settings) => fetched,
        };

        let tiles = match fetched {
            Fetch::Batch(tiles) => tiles,
            Fetch::Idle => continue,
            Fetch::Ended => {
                debug!(session = %session.trace_id(), "engine ended the session");
                return;
            }
            Fetch::Failed(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        if tiles.is_empty() {
            tokio::task::yield_now().await;
            continue;
        }
        debug!(session = %session.trace_id(), tiles = tiles.len(), "batch received");

        for tile in tiles {
            let item = validate_tile(tile, settings.max_tile_bytes);
            let failed = item.is_err();
            let sent = tokio::select! {
                biased;
                _ = stop.cancelled() => return,
                sent = tx.send(item) => sent,
            };
            if sent.is_err() || failed {
                return;
            }
        }
    }
}

/// One engine fetch under the engine lock, bounded by `fetch_timeout`.
async fn fetch_batch(session: &Session, settings: &SessionSettings) -> Fetch {
    let mut engine = session.engine().lock().await;
    let Some(engine) = engine.as_mut() else {
        return Fetch::Ended;
    };
    match time::timeout(settings.fetch_timeout, engine.next_batch()).await {
        Err(_) => Fetch::Idle,
        Ok(Ok(Some(tiles))) => Fetch::Batch(tiles),
        Ok(Ok(None)) => Fetch::Ended,
        Ok(Err(e)) => Fetch::Failed(ClientError::from_stream_failure(e)),
    }
}

fn validate_tile(tile: BitmapTile, max_tile_bytes: usize) -> TileItem {
    if !tile.rect.is_well_formed() {
        return Err(ClientError::Protocol(format!(
            "inverted tile rectangle {:?}",
            tile.rect
        )));
    }
    if tile.len() > max_tile_bytes {
        return Err(ClientError::Protocol(format!(
            "tile of {} bytes exceeds the {max_tile_bytes} byte limit",
            tile.len()
        )));
    }
    let area = u64::from(tile.rect.width()) * u64::from(tile.rect.height());
    if tile.len() as u64 > area * MAX_BYTES_PER_PIXEL {
        return Err(ClientError::Protocol(format!(
            "tile of {} bytes is larger than its {}x{} rectangle",
            tile.len(),
            tile.rect.width(),
            tile.rect.height()
        )));
    }
    Ok(tile)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
