//! Domain entities for the RDP client boundary.
//!
//! Everything in here is plain data with validation rules attached.  Nothing
//! performs I/O, so every type can be unit-tested without a remote desktop.

/// Input events forwarded from the host to the remote session.
pub mod input;

/// Connection parameters submitted by the host to open a session.
pub mod params;

/// Decoded display updates streamed from the remote session to the host.
pub mod tile;
