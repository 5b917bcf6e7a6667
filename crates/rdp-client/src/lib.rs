//! rdp-client library entry point.
//!
//! Exposes an RDP client to a host process written in another language.  The
//! host opens sessions, streams decoded screen tiles back through a
//! callback, injects pointer and keyboard input, and tears sessions down.
//!
//! # How a session flows through the crate (for beginners)
//!
//! ```text
//! host                         rdp-client                         engine
//! ────                         ──────────                         ──────
//! connect(addr, user, pw) ──>  ConnectUseCase ───────────────────> connect()
//!                         <──  SessionHandle (index + generation)
//! stream_output(h, ref)   ──>  StreamOutputUseCase
//!                                pump task  <────────────────────  next_batch()
//!                                  │ bounded channel
//! deliver_tile(ref, tile) <──    adapter (caller's thread)
//! write_pointer(h, ev)    ──>  InjectInputUseCase ───────────────> write_pointer()
//! close(h)                ──>  LifecycleController ──────────────> shutdown()
//! free(h)                 ──>  LifecycleController (slot released)
//! ```
//!
//! The host never holds a pointer into this crate.  A [`SessionHandle`] is an
//! index plus a generation counter into an owning arena, so a stale handle
//! is detected on every call instead of dereferencing freed memory.
//!
//! # Layers
//!
//! - **`application`** – the use cases and the session arena.  Depends only
//!   on `rdp_core`.
//! - **`infrastructure`** – the C ABI, TOML configuration, logging setup,
//!   and the mock engine used by tests.
//! - **`client`** – [`RdpClient`], the composition root that wires the use
//!   cases to a tokio runtime and exposes a synchronous API.

/// Application layer: use cases, session arena, error taxonomy.
pub mod application;

/// Composition root exposing the synchronous boundary API.
pub mod client;

/// Infrastructure layer: C ABI, configuration, logging, mock engine.
pub mod infrastructure;

pub use application::error::{ClientError, ErrorKind};
pub use application::registry::SessionHandle;
pub use application::session::LifecycleState;
pub use application::stream_output::{SinkError, TileSink};
pub use client::RdpClient;
pub use infrastructure::storage::config::{ClientConfig, ConfigError};
