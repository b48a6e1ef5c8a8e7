//! A transport paired with the protocol that speaks over it

use crate::protocol::Protocol;
use crate::transport::Transport;
use inkcut_core::Result;

/// Largest read drained per poll
pub const READ_CHUNK: usize = 1024;

/// Owns a [`Transport`] and a [`Protocol`] and forwards calls between them.
///
/// `open` notifies the protocol after connecting and `close` after
/// disconnecting, so protocols can send init strings and reset state.
pub struct Link {
    transport: Box<dyn Transport>,
    protocol: Box<dyn Protocol>,
}

impl Link {
    pub fn new(transport: Box<dyn Transport>, protocol: Box<dyn Protocol>) -> Self {
        Self {
            transport,
            protocol,
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn protocol_id(&self) -> &'static str {
        self.protocol.id()
    }

    /// Swap in another transport, returning the previous one
    pub fn replace_transport(&mut self, transport: Box<dyn Transport>) -> Box<dyn Transport> {
        std::mem::replace(&mut self.transport, transport)
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn always_spools(&self) -> bool {
        self.transport.always_spools()
    }

    pub async fn open(&mut self) -> Result<()> {
        self.transport.connect().await?;
        tracing::info!(
            "Connected to {} using {}",
            self.transport.name(),
            self.protocol.id()
        );
        self.protocol.connection_made(self.transport.as_mut()).await
    }

    /// Disconnect when connected. The protocol is told either way.
    pub async fn close(&mut self) -> Result<()> {
        let result = if self.transport.is_connected() {
            self.transport.disconnect().await
        } else {
            Ok(())
        };
        self.protocol.connection_lost();
        tracing::info!("Disconnected from {}", self.transport.name());
        result
    }

    pub async fn move_to(&mut self, x: f64, y: f64, z: u8, absolute: bool) -> Result<()> {
        self.protocol
            .move_to(self.transport.as_mut(), x, y, z, absolute)
            .await
    }

    pub async fn set_pen(&mut self, pen: i32) -> Result<()> {
        self.protocol.set_pen(self.transport.as_mut(), pen).await
    }

    pub async fn set_force(&mut self, force: f64) -> Result<()> {
        self.protocol.set_force(self.transport.as_mut(), force).await
    }

    pub async fn set_velocity(&mut self, velocity: f64) -> Result<()> {
        self.protocol
            .set_velocity(self.transport.as_mut(), velocity)
            .await
    }

    /// Send a raw command block through the protocol
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.protocol.write(self.transport.as_mut(), data).await
    }

    pub async fn finish(&mut self) -> Result<()> {
        self.protocol.finish(self.transport.as_mut()).await
    }

    /// Hand any pending device output to the protocol. Returns the byte count.
    pub async fn poll(&mut self) -> Result<usize> {
        let data = self.transport.read(READ_CHUNK).await?;
        if !data.is_empty() {
            tracing::debug!(
                "<- {} | {}",
                self.transport.name(),
                String::from_utf8_lossy(&data)
            );
            self.protocol.data_received(&data);
        }
        Ok(data.len())
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("transport", &self.transport.name())
            .field("protocol", &self.protocol.id())
            .field("connected", &self.transport.is_connected())
            .finish()
    }
}
