//! Byte-level links to a cutter
//!
//! A [`Transport`] only moves bytes. Encoding motion into a device language
//! is the job of a [`crate::Protocol`]; the two are paired by a
//! [`crate::Link`].
//!
//! Supports:
//! - Serial ports (USB/RS-232) via `serialport`
//! - Raw character devices and parallel ports
//! - The OS print spooler (`lpr`)
//! - Outbound TCP sockets
//! - Capture to a file on disk
//! - An in-memory test transport

pub mod file;
pub mod printer;
pub mod raw;
pub mod serial;
pub mod tcp;
pub mod test;

pub use file::{FileConfig, FileTransport};
pub use printer::{PrinterConfig, PrinterTransport};
pub use raw::{RawConfig, RawTransport};
pub use serial::{list_ports, SerialConfig, SerialParity, SerialPortInfo, SerialTransport};
pub use tcp::{TcpConfig, TcpTransport};
pub use test::{TestTransport, TestTransportHandle};

use async_trait::async_trait;
use inkcut_core::Result;
use serde::{Deserialize, Serialize};

/// A connection that bytes can be written to and read from
#[async_trait]
pub trait Transport: Send {
    /// Short name used in log lines, e.g. the port or file path
    fn name(&self) -> &str;

    /// Open the link
    async fn connect(&mut self) -> Result<()>;

    /// Write all of `data` to the link
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read at most `max` pending bytes.
    ///
    /// Never waits for data: returns an empty buffer when nothing is pending.
    async fn read(&mut self, max: usize) -> Result<Vec<u8>>;

    /// Close the link. Closing a link that is not open is a no-op.
    async fn disconnect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Whether the sink buffers and paces output itself
    fn always_spools(&self) -> bool {
        false
    }
}

/// Serializable transport selection, as stored in a device profile
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Serial(SerialConfig),
    Raw(RawConfig),
    Printer(PrinterConfig),
    Tcp(TcpConfig),
    File(FileConfig),
    /// In-memory capture, nothing leaves the process
    #[default]
    Test,
}

impl TransportConfig {
    /// Create the transport. `protocol_id` names captured files.
    pub fn build(&self, protocol_id: &str) -> Box<dyn Transport> {
        match self {
            TransportConfig::Serial(c) => Box::new(SerialTransport::new(c.clone())),
            TransportConfig::Raw(c) => Box::new(RawTransport::new(c.clone())),
            TransportConfig::Printer(c) => Box::new(PrinterTransport::new(c.clone())),
            TransportConfig::Tcp(c) => Box::new(TcpTransport::new(c.clone())),
            TransportConfig::File(c) => Box::new(FileTransport::new(c.clone(), protocol_id)),
            TransportConfig::Test => Box::new(TestTransport::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_config_from_json() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"type": "serial", "port": "/dev/ttyUSB0", "baud_rate": 38400}"#)
                .unwrap();
        match config {
            TransportConfig::Serial(c) => {
                assert_eq!(c.port, "/dev/ttyUSB0");
                assert_eq!(c.baud_rate, 38400);
                assert_eq!(c.data_bits, 8);
            }
            other => panic!("unexpected {:?}", other),
        }

        let config: TransportConfig = serde_json::from_str(r#"{"type": "test"}"#).unwrap();
        assert_eq!(config, TransportConfig::Test);
    }

    #[test]
    fn test_build_spooling_flags() {
        assert!(TransportConfig::File(FileConfig::default()).build("hpgl").always_spools());
        assert!(TransportConfig::Printer(PrinterConfig::default()).build("hpgl").always_spools());
        assert!(!TransportConfig::Test.build("hpgl").always_spools());
    }
}
