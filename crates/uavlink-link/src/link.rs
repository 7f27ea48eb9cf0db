//! Background link task.
//!
//! One task per device owns the transport exclusively. It alternates
//! between servicing outbound command requests and reading bytes off
//! the wire, feeding them through the incremental decoder and handing
//! decoded messages to the dispatch bus. Control line (CTS/DSR)
//! transitions are sampled on idle read passes and broadcast as
//! [`LinkEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use uavlink_core::{Error, LinkEvent, Result, Transport};
use uavlink_wire::{Decoder, Message};

use crate::bus::DispatchBus;
use crate::envelope::TelemetryMessage;

/// System id this side stamps on outbound frames. 255 is the
/// conventional ground-station id.
pub(crate) const LOCAL_SYSTEM_ID: u8 = 255;
/// Component id for outbound frames (ground control station).
pub(crate) const LOCAL_COMPONENT_ID: u8 = 190;

/// How long a single receive pass blocks before yielding back to the
/// command channel and line sampling.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Backoff after an unexpected transport error so a dead port does not
/// spin the task.
const ERROR_BACKOFF: Duration = Duration::from_millis(50);

pub(crate) const CMD_CHANNEL_DEPTH: usize = 16;

pub(crate) enum LinkRequest {
    Send {
        message: Message,
        done_tx: oneshot::Sender<Result<()>>,
    },
    Shutdown {
        done_tx: oneshot::Sender<Result<()>>,
    },
}

pub(crate) struct LinkHandle {
    cmd_tx: mpsc::Sender<LinkRequest>,
    task: JoinHandle<()>,
}

impl LinkHandle {
    /// Asks the link task to close the transport and exit, then waits
    /// for it to finish.
    pub(crate) async fn shutdown(self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.cmd_tx
            .send(LinkRequest::Shutdown { done_tx })
            .await
            .map_err(|_| Error::NotConnected)?;
        let result = done_rx.await.map_err(|_| Error::NotConnected)?;
        let _ = self.task.await;
        result
    }

    pub(crate) fn abort(&self) {
        self.task.abort();
    }
}

/// Tracks the last observed control-line states so only transitions
/// produce events. `supported` flips off permanently the first time the
/// transport reports the lines as unavailable.
struct LineMonitor {
    cts: Option<bool>,
    dsr: Option<bool>,
    supported: bool,
}

impl LineMonitor {
    fn new() -> Self {
        Self {
            cts: None,
            dsr: None,
            supported: true,
        }
    }

    async fn sample(
        &mut self,
        transport: &mut dyn Transport,
        event_tx: &broadcast::Sender<LinkEvent>,
    ) {
        if !self.supported {
            return;
        }
        match transport.read_cts().await {
            Ok(on) => {
                if self.cts != Some(on) {
                    if self.cts.is_some() {
                        let _ = event_tx.send(LinkEvent::CtsChanged { on });
                    }
                    self.cts = Some(on);
                }
            }
            Err(Error::Unsupported(_)) => {
                self.supported = false;
                return;
            }
            Err(e) => trace!(error = %e, "CTS read failed"),
        }
        match transport.read_dsr().await {
            Ok(on) => {
                if self.dsr != Some(on) {
                    if self.dsr.is_some() {
                        let _ = event_tx.send(LinkEvent::DsrChanged { on });
                    }
                    self.dsr = Some(on);
                }
            }
            Err(Error::Unsupported(_)) => self.supported = false,
            Err(e) => trace!(error = %e, "DSR read failed"),
        }
    }
}

pub(crate) fn spawn_link_task(
    transport: Box<dyn Transport>,
    bus: Arc<DispatchBus>,
    event_tx: broadcast::Sender<LinkEvent>,
    cmd_tx: mpsc::Sender<LinkRequest>,
    cmd_rx: mpsc::Receiver<LinkRequest>,
) -> LinkHandle {
    let task = tokio::spawn(link_loop(transport, bus, event_tx, cmd_rx));
    LinkHandle { cmd_tx, task }
}

async fn link_loop(
    mut transport: Box<dyn Transport>,
    bus: Arc<DispatchBus>,
    event_tx: broadcast::Sender<LinkEvent>,
    mut cmd_rx: mpsc::Receiver<LinkRequest>,
) {
    let device = bus.device_name().to_string();
    let mut decoder = Decoder::new();
    let mut seq: u8 = 0;
    let mut lines = LineMonitor::new();
    let mut buf = [0u8; 256];

    let _ = event_tx.send(LinkEvent::Connected);
    debug!(device = %device, "link task started");

    loop {
        tokio::select! {
            biased;

            request = cmd_rx.recv() => {
                match request {
                    Some(LinkRequest::Send { message, done_tx }) => {
                        let frame = message.pack(seq, LOCAL_SYSTEM_ID, LOCAL_COMPONENT_ID);
                        seq = seq.wrapping_add(1);
                        let result = transport.send(&frame.encode()).await;
                        if let Err(e) = &result {
                            warn!(device = %device, error = %e, "command write failed");
                        }
                        let _ = done_tx.send(result);
                    }
                    Some(LinkRequest::Shutdown { done_tx }) => {
                        let result = transport.close().await;
                        let _ = event_tx.send(LinkEvent::Disconnected);
                        let _ = done_tx.send(result);
                        break;
                    }
                    None => {
                        debug!(device = %device, "command channel dropped, closing link");
                        let _ = transport.close().await;
                        let _ = event_tx.send(LinkEvent::Disconnected);
                        break;
                    }
                }
            }

            received = async { transport.receive(&mut buf, READ_TIMEOUT).await } => {
                match received {
                    Ok(n) if n > 0 => {
                        dispatch_bytes(&mut decoder, &buf[..n], &device, &bus).await;
                    }
                    Ok(_) => {}
                    Err(Error::Timeout) => {
                        // Idle pass: cheap moment to sample control lines.
                        lines.sample(transport.as_mut(), &event_tx).await;
                    }
                    Err(Error::NotConnected) => {
                        warn!(device = %device, "transport disconnected, closing link");
                        let _ = event_tx.send(LinkEvent::Disconnected);
                        break;
                    }
                    Err(e) => {
                        warn!(device = %device, error = %e, "receive error");
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }

    debug!(device = %device, "link task exited");
}

/// Runs a received chunk through the decoder and publishes every frame
/// that survives validation. Decode failures are contained per frame;
/// the stream keeps flowing.
async fn dispatch_bytes(decoder: &mut Decoder, chunk: &[u8], device: &str, bus: &DispatchBus) {
    for &byte in chunk {
        let Some(frame) = decoder.feed(byte) else {
            continue;
        };
        match frame.unpack() {
            Ok(message) => {
                trace!(
                    device = %device,
                    kind = %message.kind(),
                    seq = frame.seq,
                    system_id = frame.system_id,
                    "telemetry frame"
                );
                if let Err(e) = bus
                    .publish_inbound(Arc::new(TelemetryMessage::new(message)))
                    .await
                {
                    debug!(device = %device, error = %e, "inbound publish refused");
                }
            }
            Err(e) => {
                debug!(
                    device = %device,
                    msg_id = frame.msg_id,
                    error = %e,
                    "frame payload rejected"
                );
            }
        }
    }
}
