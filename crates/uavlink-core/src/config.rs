//! Named device configuration.
//!
//! A [`DeviceConfig`] captures everything needed to bring up one vehicle
//! link: the unique device name, the serial port parameters, and the
//! dispatch mode of its bus. Configurations are plain serde structs and are
//! typically loaded from a TOML file:
//!
//! ```toml
//! device_name = "VEHICLE_A"
//! port_name = "/dev/ttyUSB0"
//! baud_rate = 57600
//! dispatch = "async"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// How a device's dispatch bus invokes its subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Each subscriber invocation is scheduled independently on worker
    /// tasks. Invocations may run concurrently with each other and with
    /// subsequent publishes. This is the default: a slow subscriber must
    /// not stall frame parsing for later bytes.
    #[default]
    Async,

    /// All matching subscribers are invoked in registration order on the
    /// publishing task before `publish_inbound` returns. Preserves
    /// per-subscriber message order at the cost of coupling subscriber
    /// latency to the decode path.
    Sync,
}

/// Connection settings for one named device.
///
/// Field defaults match the most common autopilot telemetry setup:
/// 57600 baud, 8 data bits, 1 stop bit, no parity, asynchronous dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Unique logical name of the remote device (e.g. "VEHICLE_A").
    /// Names must be unique across concurrently open devices in a process.
    pub device_name: String,

    /// Serial port path (e.g. "/dev/ttyUSB0" on Linux, "COM3" on Windows).
    pub port_name: String,

    /// Baud rate (e.g. 57600, 115200).
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Number of data bits per character (5-8).
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    /// Number of stop bits (1 or 2).
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,

    /// Parity mode: "none", "odd", or "even".
    #[serde(default = "default_parity")]
    pub parity: String,

    /// Dispatch mode of the device's bus.
    #[serde(default)]
    pub dispatch: DispatchMode,
}

fn default_baud_rate() -> u32 {
    57_600
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_parity() -> String {
    "none".into()
}

impl DeviceConfig {
    /// Create a config with default port parameters for the given name
    /// and port.
    pub fn new(device_name: &str, port_name: &str) -> Self {
        DeviceConfig {
            device_name: device_name.to_string(),
            port_name: port_name.to_string(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: default_parity(),
            dispatch: DispatchMode::default(),
        }
    }

    /// Parse a config from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::InvalidParameter(format!("bad device config: {e}")))
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }
}
