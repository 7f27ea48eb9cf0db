//! Dispatch layer for uavlink.
//!
//! This crate ties the wire codec and transport layers together into a
//! usable device surface:
//!
//! - [`DispatchBus`] fans decoded telemetry out to registered
//!   [`Subscriber`]s and forwards commands to the link task.
//! - The link task (spawned by [`DeviceBuilder`]) owns the transport,
//!   runs the incremental decoder over received bytes, and serializes
//!   outbound commands onto the wire.
//! - [`Device`] is the owning handle; [`Session`] is a cheap clone-able
//!   sender for code that only needs to issue commands.
//!
//! # Example
//!
//! ```no_run
//! use uavlink_link::{CallbackSubscriber, DeviceBuilder};
//! use std::sync::Arc;
//!
//! # async fn run() -> uavlink_core::Result<()> {
//! let device = DeviceBuilder::new("fc0")
//!     .port("/dev/ttyUSB0")
//!     .baud_rate(57_600)
//!     .build()
//!     .await?;
//!
//! device.register(Arc::new(CallbackSubscriber::new("printer", |msg| {
//!     println!("{}: {:?}", msg.kind(), msg.message());
//! })))?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod bus;
mod device;
mod envelope;
mod link;
mod session;

pub use builder::DeviceBuilder;
pub use bus::{BusState, DispatchBus, KindFilter, Subscriber};
pub use device::Device;
pub use envelope::{CommandMessage, TelemetryMessage};
pub use session::{CallbackSubscriber, Session};
