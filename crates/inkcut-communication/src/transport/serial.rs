//! Serial port transport
//!
//! Direct connection to a cutter over USB or RS-232 using the `serialport`
//! crate. Port I/O is blocking, so writes run on the blocking pool and reads
//! only touch the port when bytes are already waiting.

use super::Transport;
use async_trait::async_trait;
use inkcut_core::{ConnectionError, Error, Result};
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

/// Read/write timeout on the native port
const PORT_TIMEOUT: Duration = Duration::from_millis(10);

/// Parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    #[default]
    None,
    Even,
    Odd,
}

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port: String,
    pub baud_rate: u32,
    /// 5 to 8
    pub data_bits: u8,
    pub parity: SerialParity,
    /// 1 or 2
    pub stop_bits: u8,
    /// Software flow control
    pub xonxoff: bool,
    /// Hardware flow control
    pub rtscts: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 9600,
            data_bits: 8,
            parity: SerialParity::None,
            stop_bits: 1,
            xonxoff: false,
            rtscts: false,
        }
    }
}

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// USB vendor and product ID if applicable
    pub usb_ids: Option<(u16, u16)>,
}

/// List serial ports that could have a cutter attached
///
/// Filters to the usual USB serial patterns:
/// - Windows: COM*
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*, /dev/ttyS*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        Error::from(ConnectionError::SerialError {
            reason: e.to_string(),
        })
    })?;

    Ok(ports
        .iter()
        .filter(|port| is_cutter_port(&port.port_name))
        .map(|port| {
            let mut info = SerialPortInfo {
                port_name: port.port_name.clone(),
                description: port_description(port),
                manufacturer: None,
                usb_ids: None,
            };
            if let serialport::SerialPortType::UsbPort(usb) = &port.port_type {
                info.manufacturer = usb.manufacturer.clone();
                info.usb_ids = Some((usb.vid, usb.pid));
            }
            info
        })
        .collect())
}

fn is_cutter_port(port_name: &str) -> bool {
    if let Some(num) = port_name.strip_prefix("COM") {
        return !num.is_empty() && num.chars().all(|c| c.is_ascii_digit());
    }
    ["/dev/ttyUSB", "/dev/ttyACM", "/dev/ttyS", "/dev/cu.usbserial-", "/dev/cu.usbmodem"]
        .iter()
        .any(|prefix| port_name.starts_with(prefix))
}

fn port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb) => format!(
            "USB {} {}",
            usb.manufacturer.as_deref().unwrap_or("Device"),
            usb.product.as_deref().unwrap_or("Serial Port")
        ),
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Serial port transport
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Self {
        Self { config, port: None }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn serial_error(reason: impl ToString) -> Error {
        ConnectionError::SerialError {
            reason: reason.to_string(),
        }
        .into()
    }

    fn open(&self) -> Result<Box<dyn SerialPort>> {
        let c = &self.config;
        let data_bits = match c.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            n => return Err(Error::invalid_setting("data_bits", format!("{} is not 5-8", n))),
        };
        let stop_bits = match c.stop_bits {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            n => return Err(Error::invalid_setting("stop_bits", format!("{} is not 1 or 2", n))),
        };
        let parity = match c.parity {
            SerialParity::None => serialport::Parity::None,
            SerialParity::Even => serialport::Parity::Even,
            SerialParity::Odd => serialport::Parity::Odd,
        };
        let flow_control = if c.rtscts {
            serialport::FlowControl::Hardware
        } else if c.xonxoff {
            serialport::FlowControl::Software
        } else {
            serialport::FlowControl::None
        };

        serialport::new(&c.port, c.baud_rate)
            .timeout(PORT_TIMEOUT)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(flow_control)
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", c.port, e);
                ConnectionError::FailedToOpen {
                    target: c.port.clone(),
                    reason: e.to_string(),
                }
                .into()
            })
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn name(&self) -> &str {
        &self.config.port
    }

    async fn connect(&mut self) -> Result<()> {
        if self.config.port.is_empty() {
            return Err(Error::invalid_setting("port", "no serial port selected"));
        }
        let port = self.open()?;
        tracing::debug!("-- {} | opened at {} baud", self.config.port, self.config.baud_rate);
        self.port = Some(port);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut port = self.port.take().ok_or_else(|| ConnectionError::NotConnected {
            name: self.config.port.clone(),
        })?;
        tracing::debug!("-> {} | {}", self.config.port, String::from_utf8_lossy(data));

        let data = data.to_vec();
        let (port, result) = tokio::task::spawn_blocking(move || {
            let result = port.write_all(&data).and_then(|_| port.flush());
            (port, result)
        })
        .await
        .map_err(Self::serial_error)?;

        match result {
            Ok(()) => {
                self.port = Some(port);
                Ok(())
            }
            Err(e) => {
                // The port is dropped, so the transport reports disconnected
                tracing::error!("-- {} | write failed: {}", self.config.port, e);
                Err(ConnectionError::WriteFailed {
                    name: self.config.port.clone(),
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }

    async fn read(&mut self, max: usize) -> Result<Vec<u8>> {
        let Some(port) = self.port.as_mut() else {
            return Ok(Vec::new());
        };
        let pending = port.bytes_to_read().map_err(Self::serial_error)? as usize;
        if pending == 0 {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; pending.min(max)];
        match port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                tracing::debug!("<- {} | {}", self.config.port, String::from_utf8_lossy(&buf));
                Ok(buf)
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(Self::serial_error(e)),
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            tracing::debug!("-- {} | closed by request", self.config.port);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}
