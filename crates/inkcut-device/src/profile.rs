//! Device profiles
//!
//! A profile bundles everything needed to drive one cutter: the device
//! configuration, the transport and the protocol. Profiles are stored as
//! TOML or JSON, chosen by file extension.

use crate::config::DeviceConfig;
use crate::device::Device;
use inkcut_communication::{ProtocolConfig, TransportConfig};
use inkcut_core::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub name: String,
    pub config: DeviceConfig,
    pub transport: TransportConfig,
    pub protocol: ProtocolConfig,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            config: DeviceConfig::default(),
            transport: TransportConfig::default(),
            protocol: ProtocolConfig::default(),
        }
    }
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> Result<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        _ => Err(ConfigError::UnsupportedFormat(path.display().to_string()).into()),
    }
}

fn parse_error(path: &Path, reason: impl ToString) -> Error {
    ConfigError::Parse {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
    .into()
}

impl DeviceProfile {
    /// `<config dir>/inkcut/device.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("inkcut").join("device.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        self.config.validate()
    }

    /// Load profile from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)?;
        let profile: Self = match format {
            Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e))?,
            Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e))?,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Save profile to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self).map_err(|e| parse_error(path, e))?,
            Format::Toml => toml::to_string_pretty(self).map_err(|e| parse_error(path, e))?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        tracing::debug!("profile | saved '{}' to {}", self.name, path.display());
        Ok(())
    }

    /// Build a device with this profile's transport and protocol
    pub fn build_device(&self) -> Result<Device> {
        self.validate()?;
        let transport = self.transport.build(self.protocol.id());
        let protocol = self.protocol.build();
        Ok(Device::new(self.config.clone(), transport, protocol))
    }
}
