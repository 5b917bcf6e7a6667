//! LifecycleController: `close`, `free`, and state queries.
//!
//! `close` and `free` are built so the host cannot misuse them into undefined
//! behaviour:
//!
//! - `close` is idempotent.  The first call terminates the engine; later
//!   calls wait for that termination to finish and then return success.
//! - `free` removes the session from the arena *first*, so the handle is
//!   dead before teardown starts, then closes the session if the host skipped
//!   `close`.  A second `free` finds nothing to remove and is a no-op.
//! - Anything still holding the session (a stream that is returning, an
//!   input write in flight) keeps its own `Arc`, so freeing never pulls
//!   memory out from under a running call.

use std::sync::Arc;

use tokio::time;
use tracing::{debug, info, warn};

use crate::application::error::ClientError;
use crate::application::registry::{SessionHandle, SessionRegistry};
use crate::application::session::{LifecycleState, Session};
use crate::application::settings::SessionSettings;

/// The Lifecycle Controller.
pub struct LifecycleController {
    registry: Arc<SessionRegistry>,
    settings: SessionSettings,
}

impl LifecycleController {
    /// Creates the controller over the shared arena.
    pub fn new(registry: Arc<SessionRegistry>, settings: SessionSettings) -> Self {
        Self { registry, settings }
    }

    /// Moves the session to `Closing`, terminating the engine.
    ///
    /// # Errors
    ///
    /// [`ClientError::Usage`] if the handle is stale.  Closing an already
    /// closing session succeeds.
    pub async fn close(&self, handle: SessionHandle) -> Result<(), ClientError> {
        let session = self.registry.get(handle).ok_or_else(|| {
            warn!(handle = handle.to_raw(), "close on stale handle");
            ClientError::stale_handle()
        })?;
        self.close_session(&session).await;
        Ok(())
    }

    /// Releases the session.  Closes it first if still open.
    ///
    /// Never fails: freeing a stale handle is logged and ignored.
    pub async fn free(&self, handle: SessionHandle) {
        let Some(session) = self.registry.remove(handle) else {
            warn!(handle = handle.to_raw(), "free on stale handle ignored");
            return;
        };
        if session.is_open() {
            debug!(session = %session.trace_id(), "free without close, closing first");
        }
        self.close_session(&session).await;
        session.mark_freed();
        info!(session = %session.trace_id(), "session freed");
    }

    /// Reports the lifecycle state; stale handles report [`LifecycleState::Freed`].
    pub fn state(&self, handle: SessionHandle) -> LifecycleState {
        self.registry
            .get(handle)
            .map_or(LifecycleState::Freed, |session| session.state())
    }

    /// Frees every live session.  Used when the client itself shuts down.
    pub async fn free_all(&self) {
        for session in self.registry.drain() {
            self.close_session(&session).await;
            session.mark_freed();
        }
    }

    async fn close_session(&self, session: &Session) {
        if !session.begin_closing() {
            debug!(session = %session.trace_id(), "session already closing");
        }

        // A repeated close still waits on the lock so it returns only after
        // the first close has released the engine.
        let mut slot = session.engine().lock().await;
        let Some(mut engine) = slot.take() else {
            return;
        };

        info!(
            session = %session.trace_id(),
            address = session.address(),
            streaming = session.is_streaming(),
            "closing session"
        );
        match time::timeout(self.settings.input_timeout, engine.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(session = %session.trace_id(), "engine shutdown reported: {e}"),
            Err(_) => warn!(session = %session.trace_id(), "engine shutdown timed out"),
        }
        drop(engine);
    }
}
