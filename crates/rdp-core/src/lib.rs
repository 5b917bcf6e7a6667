//! # rdp-core
//!
//! Shared domain types for the RDP client boundary: connection parameters,
//! input events, decoded bitmap tiles, and the capability traits that the
//! external protocol engine implements.
//!
//! This crate has zero dependencies on an async runtime, OS APIs, or the
//! foreign-function boundary.  The boundary itself lives in `rdp-client`.
//!
//! # Architecture overview (for beginners)
//!
//! The RDP client is split into two halves:
//!
//! - **The engine** does the real protocol work: TCP/TLS, the RDP handshake,
//!   channel negotiation, and bitmap decompression.  This crate only
//!   describes what the engine can do, through the [`RdpEngine`] and
//!   [`EngineConnector`] traits.  Engines are plugged in from outside.
//!
//! - **The boundary** (`rdp-client`) owns sessions on behalf of a host
//!   process written in another language.  It drives the engine, streams
//!   tiles to the host, and injects host input.
//!
//! The types here are what flows between the two:
//!
//! - **`domain`** – [`ConnectionParams`], [`PointerEvent`], [`KeyboardEvent`],
//!   [`BitmapTile`] and friends.  Pure data plus validation.
//! - **`engine`** – the engine traits and [`EngineError`].

pub mod domain;
pub mod engine;

pub use domain::input::{KeyboardEvent, PointerButton, PointerEvent};
pub use domain::params::{ConnectionParams, ParamsError, MAX_DESKTOP_DIMENSION};
pub use domain::tile::{BitmapTile, TileRect};
pub use engine::{EngineConnector, EngineError, RdpEngine};
