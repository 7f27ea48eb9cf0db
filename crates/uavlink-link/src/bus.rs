//! Per-device publish/subscribe dispatch bus.
//!
//! Inbound telemetry is fanned out to registered [`Subscriber`]s either
//! inline (sync mode) or on spawned tasks gated by a bounded semaphore
//! (async mode). Outbound commands are forwarded to the link task and
//! the write result is relayed back to the caller.

use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, warn};

use uavlink_core::{DispatchMode, Error, Result};
use uavlink_wire::MessageKind;

use crate::envelope::{CommandMessage, TelemetryMessage};
use crate::link::LinkRequest;

/// Selects which telemetry kinds a subscriber receives.
#[derive(Debug, Clone, Default)]
pub enum KindFilter {
    /// Deliver every decoded message, including unknown kinds.
    #[default]
    All,
    /// Deliver only the listed kinds.
    Kinds(Vec<MessageKind>),
}

impl KindFilter {
    pub fn matches(&self, kind: MessageKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Kinds(kinds) => kinds.contains(&kind),
        }
    }
}

/// A named consumer of telemetry messages.
///
/// `on_message` must not block for long in sync mode since it runs on
/// the link task's dispatch path.
pub trait Subscriber: Send + Sync {
    fn name(&self) -> &str;

    fn filter(&self) -> KindFilter {
        KindFilter::All
    }

    fn on_message(&self, message: &TelemetryMessage);
}

/// Lifecycle of a [`DispatchBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    /// Accepting registrations and publications.
    Active,
    /// Draining in-flight async dispatches; new operations are refused.
    Closing,
    /// Fully shut down.
    Closed,
}

pub struct DispatchBus {
    device_name: String,
    mode: DispatchMode,
    state: Mutex<BusState>,
    subscribers: RwLock<Vec<Arc<dyn Subscriber>>>,
    outbound_tx: mpsc::Sender<LinkRequest>,
    dispatch_permits: Arc<Semaphore>,
    max_in_flight: usize,
}

impl DispatchBus {
    pub(crate) fn new(
        device_name: &str,
        mode: DispatchMode,
        max_in_flight: usize,
        outbound_tx: mpsc::Sender<LinkRequest>,
    ) -> Self {
        Self {
            device_name: device_name.to_string(),
            mode,
            state: Mutex::new(BusState::Active),
            subscribers: RwLock::new(Vec::new()),
            outbound_tx,
            dispatch_permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn state(&self) -> BusState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state() {
            BusState::Active => Ok(()),
            BusState::Closing | BusState::Closed => Err(Error::BusClosed),
        }
    }

    /// Registers a subscriber. Names must be unique per bus so that
    /// [`unregister`](Self::unregister) is unambiguous.
    pub fn register(&self, subscriber: Arc<dyn Subscriber>) -> Result<()> {
        self.ensure_active()?;
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        if subs.iter().any(|s| s.name() == subscriber.name()) {
            return Err(Error::InvalidParameter(format!(
                "subscriber '{}' already registered on device '{}'",
                subscriber.name(),
                self.device_name
            )));
        }
        debug!(
            device = %self.device_name,
            subscriber = subscriber.name(),
            "subscriber registered"
        );
        subs.push(subscriber);
        Ok(())
    }

    /// Removes a subscriber by name. Unknown names are not an error; the
    /// subscriber may already have been dropped by another path.
    pub fn unregister(&self, name: &str) -> Result<()> {
        self.ensure_active()?;
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        let before = subs.len();
        subs.retain(|s| s.name() != name);
        if subs.len() < before {
            debug!(device = %self.device_name, subscriber = name, "subscriber removed");
        }
        Ok(())
    }

    /// Delivers one decoded telemetry message to every matching
    /// subscriber, exactly once each.
    ///
    /// In sync mode subscribers run inline, in registration order. In
    /// async mode each delivery is spawned on its own task; a bounded
    /// semaphore caps how many may be in flight, so a slow subscriber
    /// eventually backpressures the decode path rather than growing an
    /// unbounded queue.
    pub async fn publish_inbound(&self, message: Arc<TelemetryMessage>) -> Result<()> {
        self.ensure_active()?;

        if let MessageKind::Unknown(id) = message.kind() {
            debug!(device = %self.device_name, msg_id = id, "unhandled message kind");
        }

        // Snapshot under the read lock so subscriber callbacks never run
        // while the registry is locked.
        let targets: Vec<Arc<dyn Subscriber>> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|s| s.filter().matches(message.kind()))
            .cloned()
            .collect();

        match self.mode {
            DispatchMode::Sync => {
                for subscriber in targets {
                    subscriber.on_message(&message);
                }
            }
            DispatchMode::Async => {
                for subscriber in targets {
                    let permit = self
                        .dispatch_permits
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|_| Error::BusClosed)?;
                    let message = Arc::clone(&message);
                    tokio::spawn(async move {
                        subscriber.on_message(&message);
                        drop(permit);
                    });
                }
            }
        }
        Ok(())
    }

    /// Forwards a command to the link task and waits for the write
    /// result. The link task assigns sequence numbers, so concurrent
    /// callers are serialized there rather than here.
    pub async fn publish_outbound(&self, command: CommandMessage) -> Result<()> {
        self.ensure_active()?;
        let (done_tx, done_rx) = oneshot::channel();
        self.outbound_tx
            .send(LinkRequest::Send {
                message: command.into_message(),
                done_tx,
            })
            .await
            .map_err(|_| Error::NotConnected)?;
        done_rx.await.map_err(|_| Error::NotConnected)?
    }

    /// Shuts the bus down: refuses new operations immediately, then
    /// waits for every in-flight async dispatch to complete before
    /// reporting `Closed`.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != BusState::Active {
                return;
            }
            *state = BusState::Closing;
        }

        // Owning every permit means every spawned dispatch has finished.
        match self
            .dispatch_permits
            .acquire_many(self.max_in_flight as u32)
            .await
        {
            Ok(drained) => drop(drained),
            Err(_) => warn!(device = %self.device_name, "dispatch semaphore closed early"),
        }
        self.dispatch_permits.close();

        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.clear();
        drop(subs);

        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = BusState::Closed;
        debug!(device = %self.device_name, "dispatch bus closed");
    }
}
