//! Error handling for Inkcut
//!
//! Provides error types for all layers of the device pipeline:
//! - Connection errors (transport related)
//! - Protocol errors (command encoding, flow control)
//! - Configuration errors (invalid device, transport or job settings)
//! - Job errors (pipeline state violations)
//!
//! All error types use `thiserror` for ergonomic error handling.
//! Filters and ordering handlers are total and never produce errors.

use thiserror::Error;

/// Connection error type
///
/// Represents errors raised by a transport while opening, writing to,
/// reading from or closing the physical link.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// The transport is not connected
    #[error("Not connected: {name}")]
    NotConnected {
        /// The transport name.
        name: String,
    },

    /// Failed to open the device path, port or socket
    #[error("Failed to open {target}: {reason}")]
    FailedToOpen {
        /// The path, port or address that failed to open.
        target: String,
        /// The reason it failed.
        reason: String,
    },

    /// Connection timeout
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Connection lost while a job was running
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// Write to the link failed
    #[error("Write failed on {name}: {reason}")]
    WriteFailed {
        /// The transport name.
        name: String,
        /// The underlying failure.
        reason: String,
    },

    /// Serial port error
    #[error("Serial port error: {reason}")]
    SerialError {
        /// The reason for the serial port error.
        reason: String,
    },

    /// Transport is not available on this platform
    #[error("Transport {name} is not supported on this platform")]
    Unsupported {
        /// The transport name.
        name: String,
    },
}

/// Protocol error type
///
/// Represents errors raised while encoding commands for a device language.
#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    /// The protocol does not implement the requested command
    #[error("{protocol} does not support {command}")]
    Unsupported {
        /// The protocol name.
        protocol: String,
        /// The command name.
        command: String,
    },

    /// The device replied with something the protocol cannot handle
    #[error("Unexpected reply from device: {reply}")]
    UnexpectedReply {
        /// The raw reply line.
        reply: String,
    },
}

/// Configuration error type
///
/// Raised synchronously from `submit`/`connect` before any motion starts.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// A configuration value is out of its valid range
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting {
        /// The configuration key.
        key: String,
        /// Why the value is rejected.
        reason: String,
    },

    /// A device profile could not be parsed
    #[error("Failed to parse {path}: {reason}")]
    Parse {
        /// The profile path.
        path: String,
        /// The parser message.
        reason: String,
    },

    /// The profile format is not recognised
    #[error("Unsupported profile format: {0}")]
    UnsupportedFormat(String),
}

/// Job error type
#[derive(Error, Debug, Clone)]
pub enum JobError {
    /// The job has no drawable geometry
    #[error("Job {id} has an empty path model")]
    EmptyModel {
        /// The job id.
        id: String,
    },

    /// The approval handler failed
    #[error("Approval failed: {reason}")]
    ApprovalFailed {
        /// The reason.
        reason: String,
    },
}

/// Main error type for Inkcut
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Job error
    #[error(transparent)]
    Job(#[from] JobError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Shorthand for an invalid configuration value
    pub fn invalid_setting(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Config(ConfigError::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        })
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Connection(ConnectionError::ConnectionTimeout { .. })
        )
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Io(_))
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Check if the protocol rejected a command it does not implement
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Protocol(ProtocolError::Unsupported { .. }))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
