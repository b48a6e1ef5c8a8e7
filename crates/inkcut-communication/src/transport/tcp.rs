//! Outbound TCP socket transport
//!
//! Used for networked cutters and serial-to-ethernet bridges.

use super::Transport;
use async_trait::async_trait;
use inkcut_core::{ConnectionError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9100,
            connect_timeout_ms: 5000,
        }
    }
}

impl TcpConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub struct TcpTransport {
    config: TcpConfig,
    address: String,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(config: TcpConfig) -> Self {
        let address = config.address();
        Self {
            config,
            address,
            stream: None,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn name(&self) -> &str {
        &self.address
    }

    async fn connect(&mut self) -> Result<()> {
        let timeout_ms = self.config.connect_timeout_ms;
        let stream = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            TcpStream::connect(&self.address),
        )
        .await
        .map_err(|_| ConnectionError::ConnectionTimeout { timeout_ms })?
        .map_err(|e| ConnectionError::FailedToOpen {
            target: self.address.clone(),
            reason: e.to_string(),
        })?;
        stream.set_nodelay(true)?;
        tracing::debug!("-- {} | connected", self.address);
        self.stream = Some(stream);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or_else(|| ConnectionError::NotConnected {
            name: self.address.clone(),
        })?;
        tracing::debug!("-> {} | {}", self.address, String::from_utf8_lossy(data));
        if let Err(e) = stream.write_all(data).await {
            self.stream = None;
            return Err(ConnectionError::WriteFailed {
                name: self.address.clone(),
                reason: e.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn read(&mut self, max: usize) -> Result<Vec<u8>> {
        let Some(stream) = self.stream.as_ref() else {
            return Ok(Vec::new());
        };
        let mut buf = vec![0u8; max];
        match stream.try_read(&mut buf) {
            Ok(0) => {
                tracing::debug!("-- {} | closed by peer", self.address);
                self.stream = None;
                Ok(Vec::new())
            }
            Ok(n) => {
                buf.truncate(n);
                tracing::debug!("<- {} | {}", self.address, String::from_utf8_lossy(&buf));
                Ok(buf)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) => {
                self.stream = None;
                Err(ConnectionError::ConnectionLost {
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
            tracing::debug!("-- {} | closed by request", self.address);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
