//! InjectInputUseCase: forwards host pointer and keyboard events to the engine.
//!
//! Each call takes the session's engine lock for a single write.  The lock is
//! the same one the output pump takes per fetch, so input and output never
//! touch the engine at the same time, and because the lock is FIFO a writer
//! waits for at most one fetch window.  A caller issuing events one after
//! another therefore has them applied in issue order.

use std::sync::Arc;

use rdp_core::{KeyboardEvent, PointerEvent};
use tokio::time;
use tracing::{debug, warn};

use crate::application::error::ClientError;
use crate::application::registry::{SessionHandle, SessionRegistry};
use crate::application::settings::SessionSettings;

/// An input event of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Keyboard(KeyboardEvent),
}

impl InputEvent {
    fn label(&self) -> &'static str {
        match self {
            InputEvent::Pointer(_) => "pointer",
            InputEvent::Keyboard(_) => "keyboard",
        }
    }
}

/// The Input Injector.
pub struct InjectInputUseCase {
    registry: Arc<SessionRegistry>,
    settings: SessionSettings,
}

impl InjectInputUseCase {
    /// Creates the use case over the shared arena.
    pub fn new(registry: Arc<SessionRegistry>, settings: SessionSettings) -> Self {
        Self { registry, settings }
    }

    /// Injects a pointer event.
    ///
    /// # Errors
    ///
    /// [`ClientError::Usage`] for a stale handle, [`ClientError::Transport`]
    /// if the session is closing or the write times out,
    /// [`ClientError::Rejected`] if the engine refuses the event.
    pub async fn write_pointer(
        &self,
        handle: SessionHandle,
        event: PointerEvent,
    ) -> Result<(), ClientError> {
        self.inject(handle, InputEvent::Pointer(event)).await
    }

    /// Injects a keyboard event.
    ///
    /// # Errors
    ///
    /// Same as [`write_pointer`](Self::write_pointer).
    pub async fn write_keyboard(
        &self,
        handle: SessionHandle,
        event: KeyboardEvent,
    ) -> Result<(), ClientError> {
        self.inject(handle, InputEvent::Keyboard(event)).await
    }

    /// Injects either kind of event under the engine lock.
    ///
    /// # Errors
    ///
    /// Same as [`write_pointer`](Self::write_pointer).
    pub async fn inject(
        &self,
        handle: SessionHandle,
        event: InputEvent,
    ) -> Result<(), ClientError> {
        let session = self.registry.get(handle).ok_or_else(ClientError::stale_handle)?;
        let mut slot = session.engine().lock().await;

        // `close` flips the state before it takes the engine lock, so a
        // write that wins the lock after `close` started still sees Closing.
        if !session.is_open() {
            return Err(ClientError::session_closing());
        }
        let Some(engine) = slot.as_mut() else {
            return Err(ClientError::session_closing());
        };

        debug!(session = %session.trace_id(), ?event, "injecting input");
        let write = async {
            match event {
                InputEvent::Pointer(p) => engine.write_pointer(p).await,
                InputEvent::Keyboard(k) => engine.write_keyboard(k).await,
            }
        };

        match time::timeout(self.settings.input_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(session = %session.trace_id(), "{} input failed: {e}", event.label());
                Err(ClientError::from_input_failure(e))
            }
            Err(_) => Err(ClientError::Transport(format!(
                "{} input not accepted within {:?}",
                event.label(),
                self.settings.input_timeout
            ))),
        }
    }
}
