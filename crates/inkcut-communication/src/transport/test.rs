//! In-memory transport for running the pipeline without hardware
//!
//! Every write is recorded. A [`TestTransportHandle`] shares the state so a
//! test can inspect output, script device replies and simulate a dropped
//! link while the transport itself is owned by a device.

use super::Transport;
use async_trait::async_trait;
use inkcut_core::{ConnectionError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct TestState {
    writes: Vec<Vec<u8>>,
    inbound: VecDeque<u8>,
    connected: bool,
    connects: usize,
    refuse_connect: bool,
}

/// Transport that records writes in memory
#[derive(Debug, Default)]
pub struct TestTransport {
    state: Arc<Mutex<TestState>>,
    spools: bool,
}

/// Shared view of a [`TestTransport`]
#[derive(Debug, Clone)]
pub struct TestTransportHandle {
    state: Arc<Mutex<TestState>>,
}

impl TestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the transport as a spooling sink
    pub fn spooling(mut self, spools: bool) -> Self {
        self.spools = spools;
        self
    }

    pub fn handle(&self) -> TestTransportHandle {
        TestTransportHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl TestTransportHandle {
    /// All bytes written so far
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().writes.concat()
    }

    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.written()).into_owned()
    }

    /// Individual write calls, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    pub fn clear(&self) {
        self.state.lock().writes.clear();
    }

    /// Queue bytes for the next reads, as if the device had sent them
    pub fn feed(&self, data: &[u8]) {
        self.state.lock().inbound.extend(data.iter().copied());
    }

    /// Drop the link from the device side
    pub fn drop_connection(&self) {
        self.state.lock().connected = false;
    }

    /// Make subsequent connect calls fail
    pub fn refuse_connect(&self, refuse: bool) {
        self.state.lock().refuse_connect = refuse;
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Number of successful connects
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }
}

#[async_trait]
impl Transport for TestTransport {
    fn name(&self) -> &str {
        "test"
    }

    async fn connect(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.refuse_connect {
            return Err(ConnectionError::FailedToOpen {
                target: "test".to_string(),
                reason: "connection refused".to_string(),
            }
            .into());
        }
        state.connected = true;
        state.connects += 1;
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(ConnectionError::NotConnected {
                name: "test".to_string(),
            }
            .into());
        }
        tracing::debug!("-> test | {}", String::from_utf8_lossy(data));
        state.writes.push(data.to_vec());
        Ok(())
    }

    async fn read(&mut self, max: usize) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        let n = max.min(state.inbound.len());
        Ok(state.inbound.drain(..n).collect())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.state.lock().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn always_spools(&self) -> bool {
        self.spools
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_writes_and_replays_input() {
        let mut transport = TestTransport::new();
        let handle = transport.handle();
        assert!(transport.write(b"IN;").await.is_err());

        transport.connect().await.unwrap();
        transport.write(b"IN;").await.unwrap();
        transport.write(b"PU0,0;").await.unwrap();
        assert_eq!(handle.written_string(), "IN;PU0,0;");
        assert_eq!(handle.write_count(), 2);

        handle.feed(b"ok\nok\n");
        assert_eq!(transport.read(4).await.unwrap(), b"ok\no");
        assert_eq!(transport.read(64).await.unwrap(), b"k\n");
        assert!(transport.read(64).await.unwrap().is_empty());

        handle.drop_connection();
        assert!(!transport.is_connected());
        assert!(transport.write(b"PD1,1;").await.is_err());
    }
}
