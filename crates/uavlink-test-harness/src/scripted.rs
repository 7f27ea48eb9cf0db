//! In-memory transport driven from test code.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use uavlink_core::{Error, Result, Transport};

/// A [`Transport`] whose wire is a channel: tests feed inbound bytes and
/// flip control lines through the paired [`ScriptHandle`], and inspect
/// everything the code under test wrote.
pub struct ScriptedTransport {
    incoming_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: Vec<u8>,
    cursor: usize,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    connected: Arc<AtomicBool>,
    cts: Arc<AtomicBool>,
    dsr: Arc<AtomicBool>,
    lines_supported: Arc<AtomicBool>,
}

/// Test-side controls for a [`ScriptedTransport`].
#[derive(Clone)]
pub struct ScriptHandle {
    incoming_tx: mpsc::UnboundedSender<Vec<u8>>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    connected: Arc<AtomicBool>,
    cts: Arc<AtomicBool>,
    dsr: Arc<AtomicBool>,
    lines_supported: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub fn pair() -> (Self, ScriptHandle) {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let connected = Arc::new(AtomicBool::new(true));
        let cts = Arc::new(AtomicBool::new(false));
        let dsr = Arc::new(AtomicBool::new(false));
        let lines_supported = Arc::new(AtomicBool::new(true));
        let transport = Self {
            incoming_rx,
            pending: Vec::new(),
            cursor: 0,
            sent: Arc::clone(&sent),
            connected: Arc::clone(&connected),
            cts: Arc::clone(&cts),
            dsr: Arc::clone(&dsr),
            lines_supported: Arc::clone(&lines_supported),
        };
        let handle = ScriptHandle {
            incoming_tx,
            sent,
            connected,
            cts,
            dsr,
            lines_supported,
        };
        (transport, handle)
    }
}

impl ScriptHandle {
    /// Queues bytes for the transport's next receive calls. Chunks are
    /// delivered with their boundaries intact, so tests can exercise
    /// partial-frame arrival.
    pub fn feed(&self, bytes: &[u8]) {
        let _ = self.incoming_tx.send(bytes.to_vec());
    }

    /// Everything written through the transport, one entry per `send`.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Simulates the port going away mid-session.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn set_cts(&self, on: bool) {
        self.cts.store(on, Ordering::SeqCst);
    }

    pub fn set_dsr(&self, on: bool) {
        self.dsr.store(on, Ordering::SeqCst);
    }

    /// Makes CTS/DSR reads fail, modeling adapters without control
    /// lines.
    pub fn disable_control_lines(&self) {
        self.lines_supported.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(data.to_vec());
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        if self.cursor >= self.pending.len() {
            match tokio::time::timeout(timeout, self.incoming_rx.recv()).await {
                Ok(Some(chunk)) => {
                    self.pending = chunk;
                    self.cursor = 0;
                }
                Ok(None) => return Err(Error::NotConnected),
                Err(_) => return Err(Error::Timeout),
            }
        }
        let n = buf.len().min(self.pending.len() - self.cursor);
        buf[..n].copy_from_slice(&self.pending[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn read_cts(&mut self) -> Result<bool> {
        if !self.lines_supported.load(Ordering::SeqCst) {
            return Err(Error::Unsupported("control lines".to_string()));
        }
        Ok(self.cts.load(Ordering::SeqCst))
    }

    async fn read_dsr(&mut self) -> Result<bool> {
        if !self.lines_supported.load(Ordering::SeqCst) {
            return Err(Error::Unsupported("control lines".to_string()));
        }
        Ok(self.dsr.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fed_bytes_come_back_in_order() {
        let (mut transport, handle) = ScriptedTransport::pair();
        handle.feed(&[1, 2, 3]);
        let mut buf = [0u8; 8];
        let n = transport
            .receive(&mut buf, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn small_buffer_drains_chunk_across_calls() {
        let (mut transport, handle) = ScriptedTransport::pair();
        handle.feed(&[1, 2, 3, 4]);
        let mut buf = [0u8; 3];
        let n = transport
            .receive(&mut buf, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3]);
        let n = transport
            .receive(&mut buf, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(&buf[..n], &[4]);
    }

    #[tokio::test]
    async fn quiet_line_times_out() {
        let (mut transport, _handle) = ScriptedTransport::pair();
        let mut buf = [0u8; 8];
        let result = transport.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn sent_data_is_captured() {
        let (mut transport, handle) = ScriptedTransport::pair();
        transport.send(&[9, 8, 7]).await.unwrap();
        assert_eq!(handle.sent_frames(), vec![vec![9, 8, 7]]);
    }

    #[tokio::test]
    async fn disconnect_fails_io() {
        let (mut transport, handle) = ScriptedTransport::pair();
        handle.disconnect();
        assert!(matches!(
            transport.send(&[1]).await,
            Err(Error::NotConnected)
        ));
        let mut buf = [0u8; 4];
        assert!(matches!(
            transport.receive(&mut buf, Duration::from_millis(10)).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn control_lines_reflect_handle_state() {
        let (mut transport, handle) = ScriptedTransport::pair();
        assert!(!transport.read_cts().await.unwrap());
        handle.set_cts(true);
        handle.set_dsr(true);
        assert!(transport.read_cts().await.unwrap());
        assert!(transport.read_dsr().await.unwrap());

        handle.disable_control_lines();
        assert!(matches!(
            transport.read_cts().await,
            Err(Error::Unsupported(_))
        ));
    }
}
