//! GP-GL, used by Graphtec and older Silhouette cutters

use super::{device_units, Protocol};
use crate::transport::Transport;
use async_trait::async_trait;
use inkcut_core::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct GpglProtocol;

#[async_trait]
impl Protocol for GpglProtocol {
    fn id(&self) -> &'static str {
        "gpgl"
    }

    async fn connection_made(&mut self, transport: &mut dyn Transport) -> Result<()> {
        transport.write(b"H").await
    }

    async fn move_to(
        &mut self,
        transport: &mut dyn Transport,
        x: f64,
        y: f64,
        z: u8,
        _absolute: bool,
    ) -> Result<()> {
        // D draws, M moves with the tool raised
        let cmd = if z > 0 { "D" } else { "M" };
        let (x, y) = (device_units(x, 1.0), device_units(y, 1.0));
        transport.write(format!("{}{},{};", cmd, x, y).as_bytes()).await
    }

    async fn set_force(&mut self, transport: &mut dyn Transport, force: f64) -> Result<()> {
        transport.write(format!("*{}", force as i64).as_bytes()).await
    }

    async fn set_velocity(&mut self, transport: &mut dyn Transport, velocity: f64) -> Result<()> {
        transport.write(format!("!{}", velocity as i64).as_bytes()).await
    }
}
