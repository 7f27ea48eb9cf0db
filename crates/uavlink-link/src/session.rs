//! Lightweight command sessions and closure-based subscribers.

use std::sync::Arc;

use tracing::debug;

use uavlink_core::Result;
use uavlink_wire::MessageKind;

use crate::bus::{DispatchBus, KindFilter, Subscriber};
use crate::envelope::{CommandMessage, TelemetryMessage};

/// A named handle for sending commands to a device.
///
/// Sessions are cheap to create and clone; they share the device's bus,
/// so a session created before [`crate::Device::close`] stops working
/// afterwards.
#[derive(Clone)]
pub struct Session {
    name: String,
    bus: Arc<DispatchBus>,
}

impl Session {
    pub(crate) fn new(name: &str, bus: Arc<DispatchBus>) -> Self {
        Self {
            name: name.to_string(),
            bus,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_name(&self) -> &str {
        self.bus.device_name()
    }

    /// Sends a command and waits for the wire write to complete.
    pub async fn send(&self, command: CommandMessage) -> Result<()> {
        debug!(
            session = %self.name,
            device = %self.bus.device_name(),
            kind = %command.kind(),
            "sending command"
        );
        self.bus.publish_outbound(command).await
    }
}

/// Adapts a closure into a [`Subscriber`] so callers do not need a
/// dedicated type for simple consumers.
pub struct CallbackSubscriber {
    name: String,
    filter: KindFilter,
    callback: Box<dyn Fn(&TelemetryMessage) + Send + Sync>,
}

impl CallbackSubscriber {
    pub fn new<F>(name: &str, callback: F) -> Self
    where
        F: Fn(&TelemetryMessage) + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            filter: KindFilter::All,
            callback: Box::new(callback),
        }
    }

    /// Like [`new`](Self::new) but only the listed kinds are delivered.
    pub fn with_filter<F>(name: &str, kinds: Vec<MessageKind>, callback: F) -> Self
    where
        F: Fn(&TelemetryMessage) + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            filter: KindFilter::Kinds(kinds),
            callback: Box::new(callback),
        }
    }
}

impl Subscriber for CallbackSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    fn filter(&self) -> KindFilter {
        self.filter.clone()
    }

    fn on_message(&self, message: &TelemetryMessage) {
        (self.callback)(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uavlink_wire::{Heartbeat, Message};

    #[test]
    fn callback_subscriber_invokes_closure() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        let sub = CallbackSubscriber::new("cb", move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(sub.name(), "cb");
        sub.on_message(&TelemetryMessage::new(Message::Heartbeat(
            Heartbeat::default(),
        )));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn with_filter_reports_kinds() {
        let sub = CallbackSubscriber::with_filter("hb", vec![MessageKind::Heartbeat], |_| {});
        assert!(sub.filter().matches(MessageKind::Heartbeat));
        assert!(!sub.filter().matches(MessageKind::Attitude));
    }
}
