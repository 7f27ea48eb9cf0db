//! uavlink-wire: MAVLink v1 frame codec for uavlink.
//!
//! This crate handles the pure byte-level side of the pipeline:
//!
//! - **Frame codec** ([`frame`]) -- the MAVLink v1 wire format, CRC-16/X.25
//!   checksumming, frame encoding, and the incremental [`Decoder`] that
//!   reconstructs frames one byte at a time from a noisy serial stream.
//! - **Typed messages** ([`message`]) -- the closed [`Message`] enum of
//!   telemetry/command kinds with payload pack/unpack, plus the mandatory
//!   `Unknown` arm for forward compatibility with unrecognized kinds.
//!
//! # Example
//!
//! ```
//! use uavlink_wire::{Decoder, Message, message::Heartbeat};
//!
//! // Pack a heartbeat and push its bytes through the decoder.
//! let msg = Message::Heartbeat(Heartbeat::default());
//! let bytes = msg.pack(0, 1, 1).encode();
//!
//! let mut decoder = Decoder::new();
//! let frames = decoder.feed_bytes(&bytes);
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].unpack().unwrap().kind(), msg.kind());
//! ```

pub mod frame;
pub mod message;

pub use frame::{Decoder, DecoderStats, RawFrame};
pub use message::{
    Ahrs, Attitude, GlobalPositionInt, Heartbeat, Message, MessageKind, SensorOffsets,
};
