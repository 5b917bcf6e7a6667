//! Timeouts and bounds shared by the use cases.

use std::time::Duration;

/// Runtime limits applied to every session.
///
/// Built from `ClientConfig` by the composition root; tests construct it
/// directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Upper bound on transport setup plus handshake.
    pub connect_timeout: Duration,
    /// Upper bound on one engine fetch.  An elapsed fetch is not an error;
    /// the pump releases the engine lock and polls again, so this is also
    /// the longest an input write waits behind the streamer.
    pub fetch_timeout: Duration,
    /// Upper bound on one input injection and on engine shutdown.
    pub input_timeout: Duration,
    /// Capacity of the pump-to-host tile channel.
    pub tile_channel_capacity: usize,
    /// Largest pixel buffer accepted from the engine for a single tile.
    pub max_tile_bytes: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            fetch_timeout: Duration::from_millis(100),
            input_timeout: Duration::from_secs(1),
            tile_channel_capacity: 64,
            max_tile_bytes: 64 * 1024 * 1024,
        }
    }
}
