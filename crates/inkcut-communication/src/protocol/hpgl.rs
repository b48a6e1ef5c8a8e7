//! HP-GL
//!
//! Plotter units are 1/1021 inch on most vinyl cutters, so px coordinates
//! are scaled by 1021/90 and truncated to integers.

use super::{device_units, Protocol};
use crate::transport::Transport;
use async_trait::async_trait;
use inkcut_core::Result;
use serde::{Deserialize, Serialize};

/// Plotter units per px
pub const HPGL_SCALE: f64 = 1021.0 / 90.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HpglConfig {
    /// Emit `y,x` instead of `x,y` for cutters with swapped axes
    pub swap_xy: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HpglProtocol {
    config: HpglConfig,
}

impl HpglProtocol {
    pub fn new(config: HpglConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Protocol for HpglProtocol {
    fn id(&self) -> &'static str {
        "hpgl"
    }

    async fn connection_made(&mut self, transport: &mut dyn Transport) -> Result<()> {
        transport.write(b"IN;").await
    }

    async fn move_to(
        &mut self,
        transport: &mut dyn Transport,
        x: f64,
        y: f64,
        z: u8,
        _absolute: bool,
    ) -> Result<()> {
        let (mut x, mut y) = (device_units(x, HPGL_SCALE), device_units(y, HPGL_SCALE));
        if self.config.swap_xy {
            std::mem::swap(&mut x, &mut y);
        }
        let pen = if z > 0 { "PD" } else { "PU" };
        transport.write(format!("{}{},{};", pen, x, y).as_bytes()).await
    }

    async fn set_pen(&mut self, transport: &mut dyn Transport, pen: i32) -> Result<()> {
        transport.write(format!("SP{};", pen).as_bytes()).await
    }

    async fn set_force(&mut self, transport: &mut dyn Transport, force: f64) -> Result<()> {
        transport.write(format!("FS{}; ", force as i64).as_bytes()).await
    }

    async fn set_velocity(&mut self, transport: &mut dyn Transport, velocity: f64) -> Result<()> {
        transport.write(format!("VS{};", velocity as i64).as_bytes()).await
    }

    async fn finish(&mut self, transport: &mut dyn Transport) -> Result<()> {
        transport.write(b"IN;").await
    }
}
