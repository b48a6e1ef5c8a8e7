//! # Inkcut Communication
//!
//! Transports and device languages for Inkcut.
//!
//! A [`Transport`] moves bytes over serial, raw device, print spooler, TCP
//! or file links. A [`Protocol`] encodes motion for HPGL, CAMM-GL, GPGL,
//! DMPL and G-code cutters. [`Link`] pairs the two.

pub mod link;
pub mod protocol;
pub mod transport;

pub use link::Link;
pub use protocol::{
    CammProtocol, DebugProtocol, DmplConfig, DmplMode, DmplProtocol, GCodeConfig, GCodeProtocol,
    GpglProtocol, HpglConfig, HpglProtocol, Protocol, ProtocolConfig, StreamMode, ToolLiftMode,
};
pub use transport::{
    list_ports, FileConfig, FileTransport, PrinterConfig, PrinterTransport, RawConfig,
    RawTransport, SerialConfig, SerialParity, SerialPortInfo, SerialTransport, TcpConfig,
    TcpTransport, TestTransport, TestTransportHandle, Transport, TransportConfig,
};
