use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tokio::fs;

use crate::hal::mock::DeviceTable;
use crate::hal::DeviceManager;
use crate::session::DeviceSession;

/// Which device a host configuration refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceSelector {
    Index(u32),
    Serial(String),
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

/// Async read geometry; absent or zero values mean driver defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub buffer_count: Option<u32>,
    #[serde(default)]
    pub buffer_length: Option<u32>,
}

/// Host configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    pub version: String,
    #[serde(default)]
    pub device: DeviceSelector,
    /// Applied through `DeviceSession::configure`
    #[serde(default = "empty_settings")]
    pub settings: Value,
    #[serde(default)]
    pub stream: StreamConfig,
    /// Device table for the simulator, when running without hardware
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulator: Option<DeviceTable>,
}

fn empty_settings() -> Value {
    Value::Object(Default::default())
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            device: DeviceSelector::default(),
            settings: empty_settings(),
            stream: StreamConfig::default(),
            simulator: None,
        }
    }
}

impl HostConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        // Write to temporary file first
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json)
            .await
            .context("Failed to write temporary config file")?;

        fs::rename(&temp_path, path)
            .await
            .context("Failed to atomically update config file")?;

        Ok(())
    }

    /// Load `path`, writing the default configuration first if it is missing
    pub async fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
            Self::default().save(path).await?;
        }

        Self::load(path).await
    }

    /// Open the selected device and apply the configured settings
    pub fn open_session(&self, manager: &DeviceManager) -> Result<DeviceSession> {
        let mut session = match &self.device {
            DeviceSelector::Index(index) => manager.open(*index),
            DeviceSelector::Serial(serial) => manager.open_by_serial(serial),
        }
        .with_context(|| format!("Failed to open device {:?}", self.device))?;

        session
            .configure(&self.settings)
            .context("Failed to apply device settings")?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_host_config_json_format() {
        let config: HostConfig = serde_json::from_value(json!({
            "version": "1.0",
            "device": {"serial": "00000002"},
            "settings": {"sample_rate": 2048000},
            "stream": {"buffer_count": 4}
        }))
        .unwrap();

        assert_eq!(config.device, DeviceSelector::Serial("00000002".to_string()));
        assert_eq!(config.stream.buffer_count, Some(4));
        assert_eq!(config.stream.buffer_length, None);
        assert!(config.simulator.is_none());
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config: HostConfig = serde_json::from_str(r#"{"version": "1.0"}"#).unwrap();
        assert_eq!(config, HostConfig::default());
    }
}
