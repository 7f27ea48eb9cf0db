//! Async serial telemetry and command link for MAVLink-speaking
//! autopilots.
//!
//! `uavlink` opens a serial port to a flight controller, decodes the
//! telemetry stream into typed messages, and fans them out to
//! subscribers on a per-device dispatch bus. Commands travel the other
//! way: packed into frames, stamped with this side's ids and a rolling
//! sequence number, and written to the wire.
//!
//! The crate is a thin facade over the workspace layers:
//!
//! - [`uavlink_wire`]: frame codec, incremental decoder, typed messages
//! - [`uavlink_transport`]: serial port transport
//! - [`uavlink_link`]: dispatch bus, link task, device surface
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use uavlink::{CallbackSubscriber, DeviceBuilder, MessageKind};
//!
//! # async fn run() -> uavlink::Result<()> {
//! let device = DeviceBuilder::new("fc0")
//!     .port("/dev/ttyUSB0")
//!     .baud_rate(57_600)
//!     .build()
//!     .await?;
//!
//! device.register(Arc::new(CallbackSubscriber::with_filter(
//!     "attitude-log",
//!     vec![MessageKind::Attitude],
//!     |msg| println!("{:?}", msg.message()),
//! )))?;
//!
//! // ... run until done ...
//! device.close().await?;
//! # Ok(())
//! # }
//! ```

pub use uavlink_core::{
    DeviceConfig, DispatchMode, Error, LinkEvent, Result, Transport,
};
pub use uavlink_link::{
    BusState, CallbackSubscriber, CommandMessage, Device, DeviceBuilder, DispatchBus, KindFilter,
    Session, Subscriber, TelemetryMessage,
};
pub use uavlink_transport::{SerialConfig, SerialTransport};
pub use uavlink_wire::{
    Ahrs, Attitude, Decoder, DecoderStats, GlobalPositionInt, Heartbeat, Message, MessageKind,
    RawFrame, SensorOffsets,
};
