//! Connection parameters for opening an RDP session.
//!
//! A [`ConnectionParams`] value can only be built through
//! [`ConnectionParams::new`], which validates every field.  Once built it is
//! immutable: the engine receives a shared reference and cannot alter what
//! the host submitted.
//!
//! The secret is held in a [`Zeroizing`] buffer so the password bytes are
//! wiped from memory when the parameters are dropped, and it never appears
//! in `Debug` output.

use std::fmt;

use thiserror::Error;
use zeroize::Zeroizing;

/// Largest desktop width or height an RDP server will negotiate.
pub const MAX_DESKTOP_DIMENSION: u16 = 8192;

/// Validation failures for [`ConnectionParams`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParamsError {
    /// A required text field was empty or whitespace only.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A desktop dimension was zero or above [`MAX_DESKTOP_DIMENSION`].
    #[error("{field} {value} is outside the supported range 1..={max}")]
    DimensionOutOfRange {
        field: &'static str,
        value: u16,
        max: u16,
    },
}

/// Everything the engine needs to open one session.
#[derive(Clone)]
pub struct ConnectionParams {
    address: String,
    username: String,
    secret: Zeroizing<String>,
    width: u16,
    height: u16,
}

impl ConnectionParams {
    /// Validates and builds a new parameter set.
    ///
    /// # Errors
    ///
    /// Returns [`ParamsError::Empty`] for a blank address, username, or
    /// secret, and [`ParamsError::DimensionOutOfRange`] when `width` or
    /// `height` is zero or larger than [`MAX_DESKTOP_DIMENSION`].
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
        width: u16,
        height: u16,
    ) -> Result<Self, ParamsError> {
        let address = address.into();
        let username = username.into();
        let secret = Zeroizing::new(secret.into());

        require_text(&address, "address")?;
        require_text(&username, "username")?;
        require_text(&secret, "secret")?;
        require_dimension(width, "width")?;
        require_dimension(height, "height")?;

        Ok(Self {
            address,
            username,
            secret,
            width,
            height,
        })
    }

    /// Remote address, usually `host:port`.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Account name used for authentication.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password for [`username`](Self::username).
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Requested desktop width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Requested desktop height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

fn require_text(value: &str, field: &'static str) -> Result<(), ParamsError> {
    if value.trim().is_empty() {
        return Err(ParamsError::Empty(field));
    }
    Ok(())
}

fn require_dimension(value: u16, field: &'static str) -> Result<(), ParamsError> {
    if value == 0 || value > MAX_DESKTOP_DIMENSION {
        return Err(ParamsError::DimensionOutOfRange {
            field,
            value,
            max: MAX_DESKTOP_DIMENSION,
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
