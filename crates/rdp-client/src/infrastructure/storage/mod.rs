//! Configuration persistence.
//!
//! - **`config`** – TOML-backed [`ClientConfig`](config::ClientConfig) with
//!   serde defaults for every field.

pub mod config;
