//! Device languages
//!
//! A [`Protocol`] turns motion and tool calls into the command strings a
//! cutter understands and writes them to the transport it is handed. The
//! protocol never owns the transport; every call receives it explicitly.
//!
//! Coordinates arrive in px (1/90 inch). `z` is 0 for tool up and 1 for
//! tool down.

pub mod camm;
pub mod debug;
pub mod dmpl;
pub mod gcode;
pub mod gpgl;
pub mod hpgl;

pub use camm::CammProtocol;
pub use debug::DebugProtocol;
pub use dmpl::{DmplConfig, DmplMode, DmplProtocol};
pub use gcode::{GCodeConfig, GCodeProtocol, StreamMode, ToolLiftMode};
pub use gpgl::GpglProtocol;
pub use hpgl::{HpglConfig, HpglProtocol};

use crate::transport::Transport;
use async_trait::async_trait;
use inkcut_core::{ProtocolError, Result};
use serde::{Deserialize, Serialize};

/// Build the error a protocol returns for a command its language lacks
pub fn unsupported(protocol: &str, command: &str) -> inkcut_core::Error {
    ProtocolError::Unsupported {
        protocol: protocol.to_string(),
        command: command.to_string(),
    }
    .into()
}

/// Integer device units, truncated toward zero
pub(crate) fn device_units(value: f64, scale: f64) -> i64 {
    (value * scale) as i64
}

#[async_trait]
pub trait Protocol: Send {
    /// Lowercase identifier, also used as the capture file extension
    fn id(&self) -> &'static str;

    /// Called once the transport is open
    async fn connection_made(&mut self, transport: &mut dyn Transport) -> Result<()>;

    /// Move the tool to `(x, y)` with the tool up (`z == 0`) or down
    async fn move_to(
        &mut self,
        transport: &mut dyn Transport,
        x: f64,
        y: f64,
        z: u8,
        absolute: bool,
    ) -> Result<()>;

    async fn set_pen(&mut self, _transport: &mut dyn Transport, _pen: i32) -> Result<()> {
        Err(unsupported(self.id(), "set_pen"))
    }

    async fn set_force(&mut self, _transport: &mut dyn Transport, _force: f64) -> Result<()> {
        Err(unsupported(self.id(), "set_force"))
    }

    async fn set_velocity(&mut self, _transport: &mut dyn Transport, _velocity: f64) -> Result<()> {
        Err(unsupported(self.id(), "set_velocity"))
    }

    /// Send raw command text
    async fn write(&mut self, transport: &mut dyn Transport, data: &[u8]) -> Result<()> {
        transport.write(data).await
    }

    /// Bytes received from the device
    fn data_received(&mut self, data: &[u8]) {
        tracing::trace!("{} ignored {} bytes", self.id(), data.len());
    }

    /// Called after the last move of a job
    async fn finish(&mut self, _transport: &mut dyn Transport) -> Result<()> {
        Ok(())
    }

    /// Called after the transport was closed
    fn connection_lost(&mut self) {}
}

/// Serializable protocol selection, as stored in a device profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolConfig {
    Hpgl(HpglConfig),
    Camm,
    Gpgl,
    Dmpl(DmplConfig),
    Gcode(GCodeConfig),
    Debug,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig::Hpgl(HpglConfig::default())
    }
}

impl ProtocolConfig {
    pub fn id(&self) -> &'static str {
        match self {
            ProtocolConfig::Hpgl(_) => "hpgl",
            ProtocolConfig::Camm => "camm",
            ProtocolConfig::Gpgl => "gpgl",
            ProtocolConfig::Dmpl(_) => "dmpl",
            ProtocolConfig::Gcode(_) => "gcode",
            ProtocolConfig::Debug => "debug",
        }
    }

    pub fn build(&self) -> Box<dyn Protocol> {
        match self {
            ProtocolConfig::Hpgl(c) => Box::new(HpglProtocol::new(c.clone())),
            ProtocolConfig::Camm => Box::new(CammProtocol),
            ProtocolConfig::Gpgl => Box::new(GpglProtocol),
            ProtocolConfig::Dmpl(c) => Box::new(DmplProtocol::new(c.clone())),
            ProtocolConfig::Gcode(c) => Box::new(GCodeProtocol::new(c.clone())),
            ProtocolConfig::Debug => Box::new(DebugProtocol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_config_from_json() {
        let config: ProtocolConfig = serde_json::from_str(r#"{"type": "hpgl"}"#).unwrap();
        assert_eq!(config, ProtocolConfig::default());

        let config: ProtocolConfig =
            serde_json::from_str(r#"{"type": "dmpl", "mode": "ec1"}"#).unwrap();
        assert_eq!(config.id(), "dmpl");
        assert_eq!(
            config,
            ProtocolConfig::Dmpl(DmplConfig { mode: DmplMode::Ec1 })
        );

        let config: ProtocolConfig =
            serde_json::from_str(r#"{"type": "gcode", "stream_mode": "ok", "precision": 2}"#)
                .unwrap();
        match config {
            ProtocolConfig::Gcode(c) => {
                assert_eq!(c.stream_mode, StreamMode::Ok);
                assert_eq!(c.precision, 2);
                assert!(c.use_builtin);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_build_matches_id() {
        let configs = [
            ProtocolConfig::default(),
            ProtocolConfig::Camm,
            ProtocolConfig::Gpgl,
            ProtocolConfig::Dmpl(DmplConfig::default()),
            ProtocolConfig::Gcode(GCodeConfig::default()),
            ProtocolConfig::Debug,
        ];
        for config in configs {
            assert_eq!(config.build().id(), config.id());
        }
    }

    #[test]
    fn test_device_units_truncate() {
        assert_eq!(device_units(1.0, 1021.0 / 90.0), 11);
        assert_eq!(device_units(-1.0, 1021.0 / 90.0), -11);
        assert_eq!(device_units(0.99, 1.0), 0);
    }
}
