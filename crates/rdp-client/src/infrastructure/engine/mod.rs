//! Engine implementations shipped with the boundary.
//!
//! Production embedders bring their own [`EngineConnector`](rdp_core::EngineConnector)
//! and install it through
//! [`ffi::install_connector`](crate::infrastructure::ffi::install_connector).
//! The only implementation kept here is the scriptable mock.

pub mod mock;
