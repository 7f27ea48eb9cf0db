//! Device handle and global device-name registry.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;
use tracing::{debug, info};

use uavlink_core::{Error, LinkEvent, Result};

use crate::bus::{DispatchBus, Subscriber};
use crate::envelope::CommandMessage;
use crate::link::LinkHandle;
use crate::session::Session;

/// Device names currently in use, process wide. A name is claimed at
/// build time and released on close or drop so it can be reused.
static ACTIVE_DEVICE_NAMES: Lazy<Mutex<HashSet<String>>> =
    Lazy::new(|| Mutex::new(HashSet::new()));

pub(crate) fn claim_device_name(name: &str) -> Result<()> {
    let mut names = ACTIVE_DEVICE_NAMES.lock().unwrap_or_else(|e| e.into_inner());
    if !names.insert(name.to_string()) {
        return Err(Error::Connection(format!(
            "device name '{name}' is already in use"
        )));
    }
    Ok(())
}

pub(crate) fn release_device_name(name: &str) {
    ACTIVE_DEVICE_NAMES
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .remove(name);
}

/// An open link to one device.
///
/// Owns the dispatch bus and the background link task. Created by
/// [`crate::DeviceBuilder`]; callers register subscribers, open
/// sessions, and eventually call [`close`](Self::close).
pub struct Device {
    name: String,
    bus: Arc<DispatchBus>,
    link: Mutex<Option<LinkHandle>>,
    event_tx: broadcast::Sender<LinkEvent>,
}

impl Device {
    pub(crate) fn new(
        name: String,
        bus: Arc<DispatchBus>,
        link: LinkHandle,
        event_tx: broadcast::Sender<LinkEvent>,
    ) -> Self {
        Self {
            name,
            bus,
            link: Mutex::new(Some(link)),
            event_tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bus(&self) -> Arc<DispatchBus> {
        Arc::clone(&self.bus)
    }

    /// Registers a telemetry subscriber on this device's bus.
    pub fn register(&self, subscriber: Arc<dyn Subscriber>) -> Result<()> {
        self.bus.register(subscriber)
    }

    /// Removes a subscriber by name.
    pub fn unregister(&self, subscriber_name: &str) -> Result<()> {
        self.bus.unregister(subscriber_name)
    }

    /// Sends a command and waits for the wire write to complete.
    pub async fn send(&self, command: CommandMessage) -> Result<()> {
        self.bus.publish_outbound(command).await
    }

    /// Opens a named command session sharing this device's link.
    pub fn session(&self, session_name: &str) -> Session {
        Session::new(session_name, Arc::clone(&self.bus))
    }

    /// Subscribes to link lifecycle and control-line events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<LinkEvent> {
        self.event_tx.subscribe()
    }

    /// Shuts the device down: stops the link task (which closes the
    /// transport, silencing the notification source), then closes the
    /// bus, draining any in-flight async dispatches, and finally frees
    /// the device name.
    pub async fn close(&self) -> Result<()> {
        let handle = self
            .link
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(Error::NotConnected)?;

        info!(device = %self.name, "closing device");
        let shutdown_result = handle.shutdown().await;
        self.bus.close().await;
        release_device_name(&self.name);
        shutdown_result
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.link.lock() {
            if let Some(handle) = guard.take() {
                debug!(device = %self.name, "device dropped without close, aborting link task");
                handle.abort();
                release_device_name(&self.name);
            }
        }
    }
}
