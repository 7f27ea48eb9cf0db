//! Error types for uavlink.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, codec-layer, and
//! bus-layer errors are all captured here.

/// The error type for all uavlink operations.
///
/// Variants cover the failure modes of a serial telemetry pipeline:
/// the port cannot be opened, a write fails mid-session, a frame payload
/// does not unpack, or an operation races with shutdown.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The serial port could not be opened or configured, or the device
    /// name is already in use in this process. Fatal to the affected
    /// device only; surfaced at construction time.
    #[error("connection error: {0}")]
    Connection(String),

    /// A transport-level failure on an established link (write or close
    /// rejected by the driver). Surfaced to the caller, never retried.
    #[error("transport error: {0}")]
    Transport(String),

    /// A frame had valid outer structure but its payload was unrecognized
    /// or corrupt. Always contained at the frame boundary; the decoder
    /// resynchronizes and subscribers never see this error.
    #[error("decode error: {0}")]
    Decode(String),

    /// An operation was attempted on a dispatch bus that has been closed.
    #[error("bus closed")]
    BusClosed,

    /// No connection to the vehicle has been established, or the link
    /// has already been shut down.
    #[error("not connected")]
    NotConnected,

    /// Timed out waiting for data from the vehicle.
    #[error("timeout waiting for data")]
    Timeout,

    /// An invalid parameter was passed to a builder or configuration call.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested operation is not supported by this transport.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
