//! A protocol that only logs what is called

use super::Protocol;
use crate::transport::Transport;
use async_trait::async_trait;
use inkcut_core::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct DebugProtocol;

#[async_trait]
impl Protocol for DebugProtocol {
    fn id(&self) -> &'static str {
        "debug"
    }

    async fn connection_made(&mut self, transport: &mut dyn Transport) -> Result<()> {
        tracing::debug!("protocol.connection_made({})", transport.name());
        Ok(())
    }

    async fn move_to(
        &mut self,
        _transport: &mut dyn Transport,
        x: f64,
        y: f64,
        z: u8,
        absolute: bool,
    ) -> Result<()> {
        tracing::debug!("protocol.move({},{},{}, absolute={})", x, y, z, absolute);
        Ok(())
    }

    async fn set_pen(&mut self, _transport: &mut dyn Transport, pen: i32) -> Result<()> {
        tracing::debug!("protocol.set_pen({})", pen);
        Ok(())
    }

    async fn set_force(&mut self, _transport: &mut dyn Transport, force: f64) -> Result<()> {
        tracing::debug!("protocol.set_force({})", force);
        Ok(())
    }

    async fn set_velocity(&mut self, _transport: &mut dyn Transport, velocity: f64) -> Result<()> {
        tracing::debug!("protocol.set_velocity({})", velocity);
        Ok(())
    }

    async fn write(&mut self, _transport: &mut dyn Transport, data: &[u8]) -> Result<()> {
        tracing::debug!("protocol.write({})", String::from_utf8_lossy(data));
        Ok(())
    }

    fn data_received(&mut self, data: &[u8]) {
        tracing::debug!("protocol.data_received({})", String::from_utf8_lossy(data));
    }

    async fn finish(&mut self, _transport: &mut dyn Transport) -> Result<()> {
        tracing::debug!("protocol.finish()");
        Ok(())
    }

    fn connection_lost(&mut self) {
        tracing::debug!("protocol.connection_lost()");
    }
}
