//! Transport trait for vehicle communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a remote
//! vehicle. The workspace ships a serial implementation in
//! `uavlink-transport` and a scripted implementation for tests in
//! `uavlink-test-harness`.
//!
//! The link reader task in `uavlink-link` operates on a `Transport` rather
//! than directly on a serial port, so the whole decode/dispatch pipeline
//! can be exercised deterministically without hardware.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};

/// Asynchronous byte-level transport to a vehicle.
///
/// Implementations handle buffering and error mapping at the physical
/// layer. Framing and message semantics are handled by the codec and link
/// layers that consume this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the vehicle.
    ///
    /// Implementations should block only until all bytes have been handed
    /// to the underlying driver (serial TX buffer, in-memory queue).
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the vehicle into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`] if no data is
    /// received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`].
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;

    /// Read the current state of the CTS (clear-to-send) line.
    ///
    /// Transports without modem control lines return [`Error::Unsupported`];
    /// the link layer then skips line-state monitoring.
    async fn read_cts(&mut self) -> Result<bool> {
        Err(Error::Unsupported("CTS line state not available".into()))
    }

    /// Read the current state of the DSR (data-set-ready) line.
    async fn read_dsr(&mut self) -> Result<bool> {
        Err(Error::Unsupported("DSR line state not available".into()))
    }
}
