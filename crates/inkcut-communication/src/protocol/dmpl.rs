//! DM/PL, the Houston Instrument plotter language
//!
//! Older cutters differ in the coordinate resolution they expect. The mode
//! selects the init string, which sets the resolution with an `EC` command,
//! and the matching scale from px.

use super::{device_units, Protocol};
use crate::transport::Transport;
use async_trait::async_trait;
use inkcut_core::{units::PX_PER_INCH, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmplMode {
    /// Plain init, coordinates sent in px
    #[default]
    Standard,
    /// 0.001 inch
    Ec1,
    /// 0.005 inch
    Ec5,
    /// 0.025 mm
    EcN,
    /// 0.1 mm
    EcM,
}

impl DmplMode {
    pub fn init_string(self) -> &'static str {
        match self {
            DmplMode::Standard => " ;:H A L0 ",
            DmplMode::Ec1 => " ;:H A L0 EC1 ",
            DmplMode::Ec5 => " ;:H A L0 EC5 ",
            DmplMode::EcN => " ;:H A L0 ECN ",
            DmplMode::EcM => " ;:H A L0 ECM ",
        }
    }

    /// Device units per px
    pub fn scale(self) -> f64 {
        let px_per_mm = PX_PER_INCH / 25.4;
        match self {
            DmplMode::Standard => 1.0,
            DmplMode::Ec1 => 1000.0 / PX_PER_INCH,
            DmplMode::Ec5 => 200.0 / PX_PER_INCH,
            DmplMode::EcN => 1.0 / (px_per_mm * 0.025),
            DmplMode::EcM => 1.0 / (px_per_mm * 0.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DmplConfig {
    pub mode: DmplMode,
}

#[derive(Debug, Clone, Default)]
pub struct DmplProtocol {
    config: DmplConfig,
}

impl DmplProtocol {
    pub fn new(config: DmplConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Protocol for DmplProtocol {
    fn id(&self) -> &'static str {
        "dmpl"
    }

    async fn connection_made(&mut self, transport: &mut dyn Transport) -> Result<()> {
        transport.write(self.config.mode.init_string().as_bytes()).await
    }

    async fn move_to(
        &mut self,
        transport: &mut dyn Transport,
        x: f64,
        y: f64,
        z: u8,
        _absolute: bool,
    ) -> Result<()> {
        let scale = self.config.mode.scale();
        let cmd = if z > 0 { "D" } else { "U" };
        let (x, y) = (device_units(x, scale), device_units(y, scale));
        transport.write(format!("{}{},{} ", cmd, x, y).as_bytes()).await
    }

    async fn set_pen(&mut self, transport: &mut dyn Transport, pen: i32) -> Result<()> {
        transport.write(format!("P{} ", pen).as_bytes()).await
    }

    async fn set_force(&mut self, transport: &mut dyn Transport, force: f64) -> Result<()> {
        transport.write(format!("BP{} ", force as i64).as_bytes()).await
    }

    async fn set_velocity(&mut self, transport: &mut dyn Transport, velocity: f64) -> Result<()> {
        transport.write(format!("V{} ", velocity as i64).as_bytes()).await
    }
}
