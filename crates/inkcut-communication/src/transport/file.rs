//! File capture transport
//!
//! Writes the encoded job to a file instead of a device. The file name is
//! built from a template where `{time}` expands to the Unix time in seconds
//! and `{protocol}` to the lowercase protocol id.

use super::Transport;
use async_trait::async_trait;
use inkcut_core::{ConnectionError, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_NAME_TEMPLATE: &str = "inkcut-{time}.{protocol}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// File name template
    pub format: String,
    /// Output directory, created on connect when missing
    pub directory: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_NAME_TEMPLATE.to_string(),
            directory: std::env::temp_dir(),
        }
    }
}

pub struct FileTransport {
    config: FileConfig,
    protocol: String,
    path: PathBuf,
    name: String,
    file: Option<File>,
}

impl FileTransport {
    pub fn new(config: FileConfig, protocol_id: &str) -> Self {
        Self {
            config,
            protocol: protocol_id.to_lowercase(),
            path: PathBuf::new(),
            name: "file".to_string(),
            file: None,
        }
    }

    /// Path of the current or most recent capture
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn next_path(&self) -> PathBuf {
        let name = self
            .config
            .format
            .replace("{time}", &chrono::Utc::now().timestamp().to_string())
            .replace("{protocol}", &self.protocol);
        self.config.directory.join(name)
    }
}

#[async_trait]
impl Transport for FileTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.directory)
            .await
            .map_err(|e| {
                Error::from(ConnectionError::FailedToOpen {
                    target: self.config.directory.display().to_string(),
                    reason: e.to_string(),
                })
            })?;
        self.path = self.next_path();
        self.name = self.path.display().to_string();
        let file = File::create(&self.path).await.map_err(|e| {
            Error::from(ConnectionError::FailedToOpen {
                target: self.name.clone(),
                reason: e.to_string(),
            })
        })?;
        tracing::debug!("-- File | Writing to '{}'", self.name);
        self.file = Some(file);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| ConnectionError::NotConnected {
            name: self.name.clone(),
        })?;
        file.write_all(data).await?;
        Ok(())
    }

    async fn read(&mut self, _max: usize) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
            tracing::debug!("-- File | Closed '{}'", self.name);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }

    fn always_spools(&self) -> bool {
        true
    }
}
