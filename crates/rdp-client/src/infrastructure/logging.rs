//! `tracing` subscriber setup.
//!
//! The library never installs a subscriber on its own: the host calls
//! `rdp_init` (or a Rust embedder calls [`init_logging`]) once at start-up.
//! `RUST_LOG` wins over the configured level so a host can raise verbosity
//! without editing the config file.

use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber filtered by `RUST_LOG`, or by `level`
/// when the variable is unset or unparsable.
///
/// Returns `false` if a global subscriber was already installed (by an
/// earlier call or by the embedding process); the existing one stays.
pub fn init_logging(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
