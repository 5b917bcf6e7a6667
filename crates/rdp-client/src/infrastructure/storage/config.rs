//! TOML-based configuration for the client boundary.
//!
//! The host may point the library at a config file through the
//! `RDPCLIENT_CONFIG` environment variable.  Without one, every value falls
//! back to its default.  Example:
//!
//! ```toml
//! connect_timeout_ms = 15000
//! fetch_timeout_ms = 100
//! tile_channel_capacity = 64
//! log_level = "debug"
//! ```
//!
//! # Serde default values
//!
//! Every field is annotated with `#[serde(default = "some_fn")]`, so a file
//! that names only the values it wants to change is still complete.  An
//! empty file is the default configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::settings::SessionSettings;

/// Environment variable naming the config file read by
/// [`ClientConfig::load_or_default`].
pub const CONFIG_ENV_VAR: &str = "RDPCLIENT_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Runtime configuration for [`RdpClient`](crate::RdpClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Upper bound on transport setup plus handshake.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Upper bound on one engine fetch before the pump re-polls.  Also the
    /// longest an input write waits behind the output stream.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Upper bound on one input write and on engine shutdown.
    #[serde(default = "default_input_timeout_ms")]
    pub input_timeout_ms: u64,

    /// Tiles buffered between the engine pump and the host callback.
    #[serde(default = "default_tile_channel_capacity")]
    pub tile_channel_capacity: usize,

    /// Largest pixel buffer accepted for one tile (64 MiB holds a
    /// 4096x4096 tile at 32 bpp).
    #[serde(default = "default_max_tile_bytes")]
    pub max_tile_bytes: usize,

    /// Worker threads in the crate-owned tokio runtime.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_connect_timeout_ms() -> u64 {
    15_000
}
fn default_fetch_timeout_ms() -> u64 {
    100
}
fn default_input_timeout_ms() -> u64 {
    1_000
}
fn default_tile_channel_capacity() -> usize {
    64
}
fn default_max_tile_bytes() -> usize {
    64 * 1024 * 1024
}
fn default_worker_threads() -> usize {
    2
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            input_timeout_ms: default_input_timeout_ms(),
            tile_channel_capacity: default_tile_channel_capacity(),
            max_tile_bytes: default_max_tile_bytes(),
            worker_threads: default_worker_threads(),
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// Parses a config from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`]
    /// for unusable values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: ClientConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads and validates the config file at `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads the file named by `RDPCLIENT_CONFIG`, or the defaults when the
    /// variable is unset or the file does not exist.
    ///
    /// # Errors
    ///
    /// As [`load_from`](Self::load_from), except that a missing file is not
    /// an error.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let Some(path) = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from) else {
            return Ok(Self::default());
        };
        match Self::load_from(&path) {
            Err(ConfigError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Rejects values that would stall or disable the boundary.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("connect_timeout_ms", self.connect_timeout_ms as u128),
            ("fetch_timeout_ms", self.fetch_timeout_ms as u128),
            ("input_timeout_ms", self.input_timeout_ms as u128),
            ("tile_channel_capacity", self.tile_channel_capacity as u128),
            ("max_tile_bytes", self.max_tile_bytes as u128),
            ("worker_threads", self.worker_threads as u128),
        ];
        if let Some((field, _)) = nonzero.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log_level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Converts the file representation into the limits the use cases use.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
            input_timeout: Duration::from_millis(self.input_timeout_ms),
            tile_channel_capacity: self.tile_channel_capacity,
            max_tile_bytes: self.max_tile_bytes,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
