//! `RdpClient`: the composition root.
//!
//! Owns the tokio runtime and the session arena, wires the four use cases
//! together, and exposes them as plain blocking calls.  The host calls in
//! from its own threads; each call is a `block_on` on the crate runtime, so
//! streaming on one host thread and injecting input from others runs with
//! real parallelism.
//!
//! The host must not call back into the client from inside a
//! [`TileSink`]: the sink runs inside `block_on`, and tokio refuses to nest
//! a second one on the same thread.
//!
//! Dropping the client from a thread that is itself driving a tokio runtime
//! is allowed: live sessions are dropped without a graceful engine shutdown
//! and the owned runtime is shut down in the background.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use rdp_core::{ConnectionParams, EngineConnector, KeyboardEvent, PointerEvent};
use tokio::runtime::{Builder, Runtime};
use tracing::{info, warn};

use crate::application::connect::ConnectUseCase;
use crate::application::error::ClientError;
use crate::application::inject_input::InjectInputUseCase;
use crate::application::lifecycle::LifecycleController;
use crate::application::registry::{SessionHandle, SessionRegistry};
use crate::application::session::LifecycleState;
use crate::application::stream_output::{StreamOutputUseCase, TileSink};
use crate::infrastructure::storage::config::ClientConfig;

/// Synchronous entry point to the boundary.
pub struct RdpClient {
    runtime: ManuallyDrop<Runtime>,
    registry: Arc<SessionRegistry>,
    connector: ConnectUseCase,
    streamer: StreamOutputUseCase,
    injector: InjectInputUseCase,
    lifecycle: LifecycleController,
}

impl RdpClient {
    /// Builds a client over `connector` with the limits in `config`.
    ///
    /// # Errors
    ///
    /// [`ClientError::Usage`] if `config` fails validation,
    /// [`ClientError::Runtime`] if the runtime cannot be started.
    pub fn new(
        config: &ClientConfig,
        connector: Arc<dyn EngineConnector>,
    ) -> Result<Self, ClientError> {
        config
            .validate()
            .map_err(|e| ClientError::Usage(e.to_string()))?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .thread_name("rdp-client")
            .enable_all()
            .build()?;

        let settings = config.session_settings();
        let registry = Arc::new(SessionRegistry::new());
        info!(workers = config.worker_threads, ?settings, "rdp client started");

        Ok(Self {
            runtime: ManuallyDrop::new(runtime),
            connector: ConnectUseCase::new(connector, Arc::clone(&registry), settings.clone()),
            streamer: StreamOutputUseCase::new(Arc::clone(&registry), settings.clone()),
            injector: InjectInputUseCase::new(Arc::clone(&registry), settings.clone()),
            lifecycle: LifecycleController::new(Arc::clone(&registry), settings),
            registry,
        })
    }

    /// Opens a session.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidParams`] before any I/O if the parameters are
    /// malformed, [`ClientError::Connection`] if the handshake fails or
    /// times out.
    pub fn connect(
        &self,
        address: &str,
        username: &str,
        secret: &str,
        width: u16,
        height: u16,
    ) -> Result<SessionHandle, ClientError> {
        let params = ConnectionParams::new(address, username, secret, width, height)?;
        self.runtime.block_on(self.connector.connect(params))
    }

    /// Blocks the calling thread, delivering tiles to `sink` until the
    /// session ends, is closed, or fails.
    ///
    /// # Errors
    ///
    /// See [`StreamOutputUseCase::run`].
    pub fn stream_output(
        &self,
        handle: SessionHandle,
        correlation_id: i64,
        sink: &dyn TileSink,
    ) -> Result<(), ClientError> {
        self.runtime
            .block_on(self.streamer.run(handle, correlation_id, sink))
    }

    /// Injects a pointer event.
    ///
    /// # Errors
    ///
    /// See [`InjectInputUseCase::write_pointer`].
    pub fn write_pointer(
        &self,
        handle: SessionHandle,
        event: PointerEvent,
    ) -> Result<(), ClientError> {
        self.runtime.block_on(self.injector.write_pointer(handle, event))
    }

    /// Injects a keyboard event.
    ///
    /// # Errors
    ///
    /// See [`InjectInputUseCase::write_keyboard`].
    pub fn write_keyboard(
        &self,
        handle: SessionHandle,
        event: KeyboardEvent,
    ) -> Result<(), ClientError> {
        self.runtime.block_on(self.injector.write_keyboard(handle, event))
    }

    /// Terminates the session's engine.  Idempotent.
    ///
    /// # Errors
    ///
    /// [`ClientError::Usage`] if the handle is stale.
    pub fn close(&self, handle: SessionHandle) -> Result<(), ClientError> {
        self.runtime.block_on(self.lifecycle.close(handle))
    }

    /// Releases the session, closing it first if needed.  Never fails.
    pub fn free(&self, handle: SessionHandle) {
        self.runtime.block_on(self.lifecycle.free(handle));
    }

    /// Reports where the session is in its lifecycle.
    pub fn state(&self, handle: SessionHandle) -> LifecycleState {
        self.lifecycle.state(handle)
    }

    /// Number of sessions not yet freed.
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }
}

impl Drop for RdpClient {
    fn drop(&mut self) {
        // SAFETY: taken exactly once, here; `self.runtime` is never used again.
        let runtime = unsafe { ManuallyDrop::take(&mut self.runtime) };
        let in_async = tokio::runtime::Handle::try_current().is_ok();

        if !self.registry.is_empty() {
            warn!(live = self.registry.len(), "client dropped with live sessions, freeing them");
            if in_async {
                // block_on would panic inside another runtime; dropping the
                // sessions still drops their engines.
                drop(self.registry.drain());
            } else {
                runtime.block_on(self.lifecycle.free_all());
            }
        }

        // A blocking runtime drop panics on an async thread.
        if in_async {
            runtime.shutdown_background();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
