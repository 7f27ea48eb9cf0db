//! Fluent device construction.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::info;

use uavlink_core::{DeviceConfig, DispatchMode, Error, Result, Transport};
use uavlink_transport::{SerialConfig, SerialTransport};

use crate::bus::DispatchBus;
use crate::device::{claim_device_name, Device};
use crate::link::{spawn_link_task, CMD_CHANNEL_DEPTH};

const DEFAULT_MAX_IN_FLIGHT: usize = 64;
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Builds a [`Device`] step by step.
///
/// ```no_run
/// use uavlink_link::DeviceBuilder;
/// use uavlink_core::DispatchMode;
///
/// # async fn run() -> uavlink_core::Result<()> {
/// let device = DeviceBuilder::new("fc0")
///     .port("/dev/ttyUSB0")
///     .baud_rate(115_200)
///     .dispatch_mode(DispatchMode::Sync)
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct DeviceBuilder {
    device_name: String,
    port_name: Option<String>,
    baud_rate: u32,
    data_bits: u8,
    stop_bits: u8,
    parity: String,
    dispatch: DispatchMode,
    max_in_flight: usize,
}

impl DeviceBuilder {
    pub fn new(device_name: &str) -> Self {
        Self {
            device_name: device_name.to_string(),
            port_name: None,
            baud_rate: 57_600,
            data_bits: 8,
            stop_bits: 1,
            parity: "none".to_string(),
            dispatch: DispatchMode::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Starts from a loaded [`DeviceConfig`], e.g. one parsed from a
    /// TOML file.
    pub fn from_config(config: DeviceConfig) -> Self {
        Self {
            device_name: config.device_name,
            port_name: Some(config.port_name),
            baud_rate: config.baud_rate,
            data_bits: config.data_bits,
            stop_bits: config.stop_bits,
            parity: config.parity,
            dispatch: config.dispatch,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn port(mut self, port_name: &str) -> Self {
        self.port_name = Some(port_name.to_string());
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn data_bits(mut self, data_bits: u8) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn stop_bits(mut self, stop_bits: u8) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn parity(mut self, parity: &str) -> Self {
        self.parity = parity.to_string();
        self
    }

    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch = mode;
        self
    }

    /// Caps how many async dispatches may be in flight at once before
    /// the decode path backpressures.
    pub fn max_in_flight_dispatches(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Opens the configured serial port and starts the link.
    pub async fn build(self) -> Result<Device> {
        let port_name = self.port_name.clone().ok_or_else(|| {
            Error::InvalidParameter(format!(
                "device '{}' has no serial port configured",
                self.device_name
            ))
        })?;

        let mut device_config = DeviceConfig::new(&self.device_name, &port_name);
        device_config.baud_rate = self.baud_rate;
        device_config.data_bits = self.data_bits;
        device_config.stop_bits = self.stop_bits;
        device_config.parity = self.parity.clone();
        let serial_config = SerialConfig::from_device_config(&device_config)?;

        let transport = SerialTransport::open_with_config(&port_name, serial_config).await?;
        self.build_with_transport(Box::new(transport)).await
    }

    /// Starts the link over an already-open transport. Used by tests
    /// and by callers bringing their own byte stream.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Device> {
        if self.max_in_flight == 0 {
            return Err(Error::InvalidParameter(
                "max_in_flight_dispatches must be at least 1".to_string(),
            ));
        }

        claim_device_name(&self.device_name)?;

        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CHANNEL_DEPTH);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let bus = Arc::new(DispatchBus::new(
            &self.device_name,
            self.dispatch,
            self.max_in_flight,
            cmd_tx.clone(),
        ));

        let link = spawn_link_task(
            transport,
            Arc::clone(&bus),
            event_tx.clone(),
            cmd_tx,
            cmd_rx,
        );

        info!(
            device = %self.device_name,
            mode = ?self.dispatch,
            "device link started"
        );
        Ok(Device::new(self.device_name, bus, link, event_tx))
    }
}
