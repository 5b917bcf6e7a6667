//! ConnectUseCase: the Connection Factory.
//!
//! Drives the engine connector under a timeout and registers the resulting
//! engine as a new `Open` session.  Construction is all-or-nothing: if any
//! step fails, no handle is issued and whatever the engine had allocated is
//! released before the error is returned.

use std::sync::Arc;

use rdp_core::{ConnectionParams, EngineConnector};
use tokio::time;
use tracing::{error, info, warn};

use crate::application::error::ClientError;
use crate::application::registry::{SessionHandle, SessionRegistry};
use crate::application::session::Session;
use crate::application::settings::SessionSettings;

/// The Connection Factory.
pub struct ConnectUseCase {
    connector: Arc<dyn EngineConnector>,
    registry: Arc<SessionRegistry>,
    settings: SessionSettings,
}

impl ConnectUseCase {
    /// Creates the use case over a connector and the shared arena.
    pub fn new(
        connector: Arc<dyn EngineConnector>,
        registry: Arc<SessionRegistry>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            connector,
            registry,
            settings,
        }
    }

    /// Opens a session and returns its handle.
    ///
    /// The connector is invoked exactly once; there are no retries.
    ///
    /// # Errors
    ///
    /// [`ClientError::Connection`] if the handshake fails or exceeds
    /// `connect_timeout`, [`ClientError::Usage`] if the arena is full.
    pub async fn connect(&self, params: ConnectionParams) -> Result<SessionHandle, ClientError> {
        info!(
            address = params.address(),
            width = params.width(),
            height = params.height(),
            "connecting"
        );

        // Dropping the connect future on timeout releases anything the
        // engine allocated for the attempt.
        let attempt = self.connector.connect(&params);
        let engine = match time::timeout(self.settings.connect_timeout, attempt).await {
            Ok(Ok(engine)) => engine,
            Ok(Err(e)) => {
                error!(address = params.address(), "connect failed: {e}");
                return Err(ClientError::from_connect_failure(e));
            }
            Err(_) => {
                error!(
                    address = params.address(),
                    timeout = ?self.settings.connect_timeout,
                    "connect timed out"
                );
                return Err(ClientError::Connection(format!(
                    "handshake with {} did not complete within {:?}",
                    params.address(),
                    self.settings.connect_timeout
                )));
            }
        };

        let session = Arc::new(Session::new(engine, params.address()));
        match self.registry.insert(Arc::clone(&session)) {
            Ok(handle) => {
                info!(
                    session = %session.trace_id(),
                    handle = handle.to_raw(),
                    "session open"
                );
                Ok(handle)
            }
            Err(e) => {
                warn!("could not register session, terminating engine: {e}");
                if let Some(mut engine) = session.engine().lock().await.take() {
                    let _ = time::timeout(self.settings.input_timeout, engine.shutdown()).await;
                }
                Err(e)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
