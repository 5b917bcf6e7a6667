//! [`TileSink`] that forwards tiles to the host's registered callback.

use std::ffi::c_char;

use rdp_core::BitmapTile;

use super::marshal::copy_host_message;
use super::{CBitmap, HostCallbacks};
use crate::application::stream_output::{SinkError, TileSink};

/// Calls the host's `deliver_tile` for every tile.
pub(super) struct HostTileSink {
    callbacks: HostCallbacks,
}

impl HostTileSink {
    pub(super) fn new(callbacks: HostCallbacks) -> Self {
        Self { callbacks }
    }
}

impl TileSink for HostTileSink {
    fn deliver_tile(&self, correlation_id: i64, tile: &BitmapTile) -> Result<(), SinkError> {
        let bitmap = CBitmap::borrowing(tile);

        // SAFETY: `bitmap` borrows `tile.pixels`, which outlives this call;
        // the callback contract forbids keeping the pointer afterwards.
        let err: *mut c_char = unsafe { (self.callbacks.deliver_tile)(correlation_id, bitmap) };
        if err.is_null() {
            return Ok(());
        }

        // SAFETY: a non-null return is a NUL-terminated host string that we
        // now own; it is copied first and handed back to the host's free
        // function exactly once.
        let message = unsafe { copy_host_message(err) };
        unsafe { (self.callbacks.free_host_string)(err) };
        Err(SinkError(message))
    }
}
