//! Transport implementations for uavlink.
//!
//! This crate provides the concrete serial implementation of the
//! [`Transport`](uavlink_core::Transport) trait from `uavlink-core`.
//! Telemetry radios and flight controllers connect as USB virtual COM
//! ports or physical RS-232/TTL serial links, typically at 57600 or
//! 115200 baud.
//!
//! # Example
//!
//! ```no_run
//! use uavlink_transport::SerialTransport;
//! use uavlink_core::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> uavlink_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 57_600).await?;
//!
//! // Receive raw frame bytes
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_millis(100)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
