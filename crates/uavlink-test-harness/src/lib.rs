//! Test utilities for uavlink.
//!
//! Provides [`ScriptedTransport`], an in-memory [`uavlink_core::Transport`]
//! whose inbound bytes and control lines are driven from test code via a
//! [`ScriptHandle`].

mod scripted;

pub use scripted::{ScriptHandle, ScriptedTransport};
