//! One live session and its lifecycle state machine.
//!
//! # Lifecycle
//!
//! ```text
//!  connect()          close()             free()
//! ──────────> Open ───────────> Closing ───────────> Freed
//!               │                                      ▲
//!               └──────────── free() (closes first) ───┘
//! ```
//!
//! The transitions are linear.  `Open -> Closing` happens exactly once and
//! fires the session's cancellation token, which is what unblocks a running
//! output stream.  `Freed` is recorded on the session for any task still
//! holding a reference, but the authoritative signal is the arena: once
//! freed, the handle no longer resolves to this session at all.
//!
//! # Engine access
//!
//! The engine sits behind a tokio `Mutex`.  Every engine call (fetch, input
//! write, shutdown) holds the lock for exactly one operation, and the lock is
//! fair, so an input write queued behind the streamer runs as soon as the
//! current fetch returns or times out.  `close` takes the engine out of the
//! mutex, which is how later calls learn that the transport is gone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use rdp_core::RdpEngine;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::error::ClientError;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Connected; every operation is allowed.
    Open,
    /// `close` has run; the engine is terminated or terminating.
    Closing,
    /// `free` has run; the handle is permanently invalid.
    Freed,
}

/// Engine slot shared by the streamer, the injector, and `close`.
pub type EngineSlot = AsyncMutex<Option<Box<dyn RdpEngine>>>;

/// A connected session owned by the arena.
pub struct Session {
    trace_id: Uuid,
    address: String,
    engine: EngineSlot,
    state: Mutex<LifecycleState>,
    cancel: CancellationToken,
    streaming: AtomicBool,
}

impl Session {
    /// Wraps a connected engine in a new `Open` session.
    pub fn new(engine: Box<dyn RdpEngine>, address: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            address: address.into(),
            engine: AsyncMutex::new(Some(engine)),
            state: Mutex::new(LifecycleState::Open),
            cancel: CancellationToken::new(),
            streaming: AtomicBool::new(false),
        }
    }

    /// Random id attached to every log line about this session.
    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    /// Remote address the session was opened against.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` while the session accepts input and streaming.
    pub fn is_open(&self) -> bool {
        self.state() == LifecycleState::Open
    }

    /// Returns `true` while an output stream is running.
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    pub(crate) fn engine(&self) -> &EngineSlot {
        &self.engine
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Moves `Open -> Closing` and fires the cancellation token.
    ///
    /// Returns `false` if the session had already left `Open`.
    pub(crate) fn begin_closing(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != LifecycleState::Open {
            return false;
        }
        *state = LifecycleState::Closing;
        self.cancel.cancel();
        true
    }

    pub(crate) fn mark_freed(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = LifecycleState::Freed;
        self.cancel.cancel();
    }

    /// Claims the single streaming slot.
    ///
    /// # Errors
    ///
    /// [`ClientError::Usage`] if the session is not open or another stream
    /// is already running.
    pub(crate) fn begin_stream(&self) -> Result<StreamGuard<'_>, ClientError> {
        if !self.is_open() {
            return Err(ClientError::Usage(
                "cannot stream output from a session that is closing".to_string(),
            ));
        }
        self.streaming
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                ClientError::Usage(
                    "an output stream is already running for this session".to_string(),
                )
            })?;
        Ok(StreamGuard { session: self })
    }
}

/// Releases the streaming slot when the stream call returns, however it exits.
pub(crate) struct StreamGuard<'a> {
    session: &'a Session,
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        self.session.streaming.store(false, Ordering::Release);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
