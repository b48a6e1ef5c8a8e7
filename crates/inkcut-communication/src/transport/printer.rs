//! OS print spooler transport
//!
//! Pipes the job into `lpr -P <printer>`. The spooler buffers the whole job,
//! so this transport always spools and the pipeline never throttles it.

use super::Transport;
use async_trait::async_trait;
use inkcut_core::{ConnectionError, Error, Result};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Queue name passed to `lpr -P`
    pub printer: String,
    /// Spooler command
    pub command: String,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            printer: String::new(),
            command: "lpr".to_string(),
        }
    }
}

pub struct PrinterTransport {
    config: PrinterConfig,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl PrinterTransport {
    pub fn new(config: PrinterConfig) -> Self {
        Self {
            config,
            child: None,
            stdin: None,
        }
    }
}

#[async_trait]
impl Transport for PrinterTransport {
    fn name(&self) -> &str {
        &self.config.printer
    }

    async fn connect(&mut self) -> Result<()> {
        if self.config.printer.is_empty() {
            return Err(Error::invalid_setting("printer", "no printer selected"));
        }
        let mut child = Command::new(&self.config.command)
            .arg("-P")
            .arg(&self.config.printer)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ConnectionError::FailedToOpen {
                target: format!("{} -P {}", self.config.command, self.config.printer),
                reason: e.to_string(),
            })?;
        self.stdin = child.stdin.take();
        self.child = Some(child);
        tracing::debug!("-- {} | spooler started", self.config.printer);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| ConnectionError::NotConnected {
            name: self.config.printer.clone(),
        })?;
        tracing::debug!("-> {} | {}", self.config.printer, String::from_utf8_lossy(data));
        stdin
            .write_all(data)
            .await
            .map_err(|e| ConnectionError::WriteFailed {
                name: self.config.printer.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn read(&mut self, _max: usize) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn disconnect(&mut self) -> Result<()> {
        // Closing stdin ends the job and lets lpr submit it
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let status = child.wait().await?;
            if status.success() {
                tracing::debug!("-- {} | job spooled", self.config.printer);
            } else {
                tracing::warn!("-- {} | spooler exited with {}", self.config.printer, status);
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stdin.is_some()
    }

    fn always_spools(&self) -> bool {
        true
    }
}
