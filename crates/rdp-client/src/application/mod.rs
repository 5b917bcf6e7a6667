//! Application layer use cases for the RDP client boundary.
//!
//! # What lives here?
//!
//! - **`registry`** – the owning arena of sessions.  Handles are validated
//!   against it on every call.
//! - **`session`** – one live session: the engine, its lifecycle state, and
//!   the cancellation token that `close` fires.
//! - **`connect`** – the Connection Factory.
//! - **`stream_output`** – the Output Streamer (engine pump + host adapter).
//! - **`inject_input`** – the Input Injector.
//! - **`lifecycle`** – the Lifecycle Controller (`close`, `free`, `state`).
//! - **`error`** – the error taxonomy every boundary call reports.
//! - **`settings`** – timeouts and bounds shared by the use cases.
//!
//! **Dependency rule**: nothing in this module imports `infrastructure`.

pub mod connect;
pub mod error;
pub mod inject_input;
pub mod lifecycle;
pub mod registry;
pub mod session;
pub mod settings;
pub mod stream_output;
