//! Raw character device transport
//!
//! Writes straight to a device node such as `/dev/usb/lp0` or a parallel
//! port. The device is opened for writing only, so nothing is ever read back.

use super::Transport;
use async_trait::async_trait;
use inkcut_core::{ConnectionError, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub device_path: PathBuf,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/null"),
        }
    }
}

pub struct RawTransport {
    config: RawConfig,
    name: String,
    file: Option<File>,
}

impl RawTransport {
    pub fn new(config: RawConfig) -> Self {
        let name = config.device_path.display().to_string();
        Self {
            config,
            name,
            file: None,
        }
    }
}

#[async_trait]
impl Transport for RawTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self) -> Result<()> {
        if cfg!(windows) {
            return Err(ConnectionError::Unsupported {
                name: "raw device".to_string(),
            }
            .into());
        }
        let file = OpenOptions::new()
            .write(true)
            .open(&self.config.device_path)
            .await
            .map_err(|e| {
                tracing::error!("{} | {}", self.name, e);
                Error::from(ConnectionError::FailedToOpen {
                    target: self.name.clone(),
                    reason: e.to_string(),
                })
            })?;
        tracing::debug!("-- {} | opened", self.name);
        self.file = Some(file);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| ConnectionError::NotConnected {
            name: self.name.clone(),
        })?;
        tracing::debug!("-> {} | {}", self.name, String::from_utf8_lossy(data));
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read(&mut self, _max: usize) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            tracing::debug!("-- {} | closed by request", self.name);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }
}
