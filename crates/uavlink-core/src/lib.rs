//! uavlink-core: Core traits, types, and error definitions for uavlink.
//!
//! This crate defines the transport-agnostic abstractions the rest of the
//! workspace builds on. Applications usually depend on the `uavlink` facade
//! crate instead of this one directly.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel to a vehicle
//! - [`LinkEvent`] -- asynchronous link state notifications
//! - [`DeviceConfig`] -- named device + serial port settings
//! - [`Error`] / [`Result`] -- error handling

pub mod config;
pub mod error;
pub mod events;
pub mod transport;

// Re-export key types at crate root for ergonomic `use uavlink_core::*`.
pub use config::{DeviceConfig, DispatchMode};
pub use error::{Error, Result};
pub use events::LinkEvent;
pub use transport::Transport;
