//! Infrastructure layer for the RDP client boundary.
//!
//! Contains the adapters around the application layer: the C ABI the host
//! links against, configuration loading, logging setup, and the mock engine.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `rdp_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`ffi`** – `extern "C"` entry points.  Converts C strings and structs
//!   into domain types, packs [`SessionHandle`](crate::SessionHandle)s into
//!   integers, and marshals errors into owned C strings.
//!
//! - **`storage`** – TOML configuration with serde defaults.
//!
//! - **`logging`** – `tracing-subscriber` initialisation.
//!
//! - **`engine`** – a scriptable in-memory engine.  Always compiled (not
//!   behind `#[cfg(test)]`) so integration tests and embedding crates can
//!   exercise the boundary without a real RDP server.

pub mod engine;
pub mod ffi;
pub mod logging;
pub mod storage;
