//! Asynchronous link event types.
//!
//! Events are emitted by the link reader task through a
//! [`tokio::sync::broadcast`] channel when the serial link's state changes.
//! Line-state events carry no payload bytes and are sampled between receive
//! chunks, so they never interleave mid-frame with message delivery.

/// An event emitted when the state of a device link changes.
///
/// Subscribe via the device's `subscribe_events()`. Events are delivered on
/// a best-effort basis through a bounded broadcast channel; slow consumers
/// may miss events under load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The CTS (clear-to-send) line changed state.
    CtsChanged {
        /// `true` if the line is now asserted.
        on: bool,
    },

    /// The DSR (data-set-ready) line changed state.
    DsrChanged {
        /// `true` if the line is now asserted.
        on: bool,
    },

    /// The link reader task has started and the port is open.
    Connected,

    /// The link has been shut down or the transport was lost.
    Disconnected,
}
