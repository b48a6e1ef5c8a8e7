//! G-code for cutters driven by CNC or 3D printer firmware
//!
//! Two streaming modes are supported:
//! - `None`: commands are written as they come. Also used whenever the
//!   transport spools by itself.
//! - `Ok`: one line at a time. Each line raises a pending acknowledgement
//!   count and the next line is held until the firmware answers with a line
//!   starting with `ok` (GRBL, Marlin). Firmware is assumed to answer every
//!   line with exactly one `ok`.
//!
//! The tool is raised and lowered only when its state changes, either
//! implicitly through `G00`/`G01`, with user supplied G-code, or by moving
//! the Z axis.

use super::Protocol;
use crate::transport::Transport;
use async_trait::async_trait;
use inkcut_core::{ConnectionError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay between polls for an acknowledgement
pub const ACK_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Largest read while waiting for an acknowledgement
const READ_CHUNK: usize = 256;

const BUILTIN_CONNECT: &str =
    "G28; Return to home\nG98; Return to initial z\nG90; Use absolute coordinates\n";
const BUILTIN_FINISH: [&str; 2] = ["G28; Return to home\n", "G98; Return to initial z\n"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    #[default]
    None,
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolLiftMode {
    /// The firmware lifts on G00 and lowers on G01
    #[default]
    Implicit,
    /// Send `lift_gcode`/`lower_gcode`
    Custom,
    /// Append a Z coordinate to every move
    Z,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GCodeConfig {
    /// Home on connect and finish
    pub use_builtin: bool,
    pub lift_mode: ToolLiftMode,
    /// Decimal places for coordinates
    pub precision: usize,
    pub lower_z: f64,
    pub upper_z: f64,
    pub lift_gcode: String,
    pub lower_gcode: String,
    pub stream_mode: StreamMode,
}

impl Default for GCodeConfig {
    fn default() -> Self {
        Self {
            use_builtin: true,
            lift_mode: ToolLiftMode::Implicit,
            precision: 0,
            lower_z: 0.0,
            upper_z: 1.0,
            lift_gcode: String::new(),
            lower_gcode: String::new(),
            stream_mode: StreamMode::None,
        }
    }
}

#[derive(Debug, Default)]
pub struct GCodeProtocol {
    config: GCodeConfig,
    currently_up: bool,
    ok_waiting: usize,
    receive_buffer: Vec<u8>,
    /// The connected transport spools, so replies are not acknowledgements
    spooled: bool,
}

impl GCodeProtocol {
    pub fn new(config: GCodeConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &GCodeConfig {
        &self.config
    }

    /// Lines sent but not yet acknowledged
    pub fn pending_acks(&self) -> usize {
        self.ok_waiting
    }

    fn interactive(&self, transport: &dyn Transport) -> bool {
        self.config.stream_mode == StreamMode::Ok && !transport.always_spools()
    }

    fn counts_acks(&self) -> bool {
        self.config.stream_mode == StreamMode::Ok && !self.spooled
    }

    /// Lines worth sending: trimmed, without blanks and comment lines
    fn split_gcode(commands: &str) -> impl Iterator<Item = &str> {
        commands
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(';'))
    }

    async fn send_plain(transport: &mut dyn Transport, commands: &str) -> Result<()> {
        if commands.ends_with('\n') {
            transport.write(commands.as_bytes()).await
        } else {
            transport.write(format!("{}\n", commands).as_bytes()).await
        }
    }

    async fn wait_for_ok(&mut self, transport: &mut dyn Transport) -> Result<()> {
        while self.ok_waiting > 0 {
            if !transport.is_connected() {
                return Err(ConnectionError::ConnectionLost {
                    reason: format!("{} closed while waiting for ok", transport.name()),
                }
                .into());
            }
            let data = transport.read(READ_CHUNK).await?;
            if data.is_empty() {
                tokio::time::sleep(ACK_POLL_INTERVAL).await;
            } else {
                self.data_received(&data);
            }
        }
        Ok(())
    }

    async fn send_stream_ok(&mut self, transport: &mut dyn Transport, commands: &str) -> Result<()> {
        for line in Self::split_gcode(commands) {
            self.wait_for_ok(transport).await?;
            self.ok_waiting += 1;
            transport.write(format!("{}\n", line).as_bytes()).await?;
            self.wait_for_ok(transport).await?;
        }
        Ok(())
    }

    fn line_received(&mut self, line: &str) {
        if line.starts_with("ok") {
            match self.ok_waiting.checked_sub(1) {
                Some(n) => self.ok_waiting = n,
                None => tracing::debug!("gcode | unexpected ok"),
            }
        } else if !line.trim().is_empty() {
            tracing::debug!("gcode | <- {}", line);
        }
    }

    async fn send_block(&mut self, transport: &mut dyn Transport, block: String) -> Result<()> {
        self.write(transport, block.as_bytes()).await
    }
}

#[async_trait]
impl Protocol for GCodeProtocol {
    fn id(&self) -> &'static str {
        "gcode"
    }

    async fn connection_made(&mut self, transport: &mut dyn Transport) -> Result<()> {
        self.ok_waiting = 0;
        self.receive_buffer.clear();
        self.spooled = transport.always_spools();
        if self.config.use_builtin {
            self.write(transport, BUILTIN_CONNECT.as_bytes()).await?;
        }
        Ok(())
    }

    async fn move_to(
        &mut self,
        transport: &mut dyn Transport,
        x: f64,
        y: f64,
        z: u8,
        _absolute: bool,
    ) -> Result<()> {
        let up = z == 0;
        if self.currently_up != up {
            if self.config.lift_mode == ToolLiftMode::Custom {
                let block = if up {
                    self.config.lift_gcode.clone()
                } else {
                    self.config.lower_gcode.clone()
                };
                self.send_block(transport, block).await?;
            }
            self.currently_up = up;
        }

        let p = self.config.precision;
        let mut line = format!("G0{} X{:.*} Y{:.*}", z, p, x, p, y);
        if self.config.lift_mode == ToolLiftMode::Z {
            let physical_z = if up {
                self.config.upper_z
            } else {
                self.config.lower_z
            };
            line.push_str(&format!(" Z{:.*}", p, physical_z));
        }
        line.push('\n');
        self.write(transport, line.as_bytes()).await
    }

    async fn write(&mut self, transport: &mut dyn Transport, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let commands = String::from_utf8_lossy(data).into_owned();
        if self.interactive(transport) {
            self.send_stream_ok(transport, &commands).await
        } else {
            Self::send_plain(transport, &commands).await
        }
    }

    fn data_received(&mut self, data: &[u8]) {
        if !self.counts_acks() {
            return;
        }
        self.receive_buffer.extend_from_slice(data);
        while let Some(pos) = self.receive_buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.receive_buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            self.line_received(&line);
        }
    }

    async fn finish(&mut self, transport: &mut dyn Transport) -> Result<()> {
        if self.config.use_builtin {
            for block in BUILTIN_FINISH {
                self.write(transport, block.as_bytes()).await?;
            }
        }
        Ok(())
    }

    fn connection_lost(&mut self) {
        self.ok_waiting = 0;
        self.receive_buffer.clear();
    }
}
