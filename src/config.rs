//! Configuration management for MidiCtrl
//!
//! Loads the YAML file describing devices and their mappings. Structural
//! problems (no devices, duplicate names, out of range CCs) fail the load;
//! invalid mapping fields are left to mapping registration, which rejects
//! them one by one without failing the whole file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::MappingError;
use crate::mapping::{Mapping, MappingTable};

/// Highest control id a 7-bit CC can carry
const MAX_CONTROL_ID: u32 = 127;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    pub devices: Vec<DeviceConfig>,
}

/// Settings not tied to a device
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Host tick period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

/// One hardware controller
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub name: String,
    pub port_in: usize,
    pub port_out: usize,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

/// Mapping type tag
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Cmd,
    Drf,
    Pnp,
}

/// One mapping entry as written in the file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    pub cc: u32,
    #[serde(rename = "type")]
    pub kind: MappingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<DatarefValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_push: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_pull: Option<String>,
}

/// Dataref value (number or string)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DatarefValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for DatarefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatarefValue::Integer(n) => write!(f, "{}", n),
            DatarefValue::Float(n) => write!(f, "{}", n),
            DatarefValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl MappingConfig {
    /// Build the mapping; missing fields become empty and fail validation
    pub fn to_mapping(&self) -> Mapping {
        let text = |field: &Option<String>| field.clone().unwrap_or_default();

        match self.kind {
            MappingKind::Cmd => Mapping::Command {
                control_id: self.cc,
                command: text(&self.command),
            },
            MappingKind::Drf => Mapping::Dataref {
                control_id: self.cc,
                dataref: text(&self.dataref),
                values: self
                    .values
                    .iter()
                    .flatten()
                    .map(|v| v.to_string())
                    .collect(),
            },
            MappingKind::Pnp => Mapping::PushAndPull {
                control_id: self.cc,
                push: text(&self.command_push),
                pull: text(&self.command_pull),
            },
        }
    }
}

impl DeviceConfig {
    /// Register every configured mapping
    ///
    /// Rejected mappings are returned alongside the table instead of
    /// failing the device.
    pub fn build_table(&self) -> (MappingTable, Vec<MappingError>) {
        let mut table = MappingTable::new();
        let mut rejected = Vec::new();

        for entry in &self.mappings {
            if let Err(e) = table.register(entry.to_mapping()) {
                rejected.push(e);
            }
        }

        (table, rejected)
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        info!(
            "Loaded {} device(s) from {}",
            config.devices.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.general.tick_ms == 0 {
            anyhow::bail!("general.tick_ms must be greater than 0");
        }

        if self.devices.is_empty() {
            anyhow::bail!("At least one device must be defined");
        }

        let mut names = HashSet::new();
        for (idx, device) in self.devices.iter().enumerate() {
            if device.name.is_empty() {
                anyhow::bail!("Device {} name cannot be empty", idx);
            }
            if !names.insert(device.name.as_str()) {
                anyhow::bail!("Device name '{}' is used more than once", device.name);
            }

            for mapping in &device.mappings {
                if mapping.cc > MAX_CONTROL_ID {
                    anyhow::bail!(
                        "Device '{}' has invalid CC number {} (must be 0-{})",
                        device.name,
                        mapping.cc,
                        MAX_CONTROL_ID
                    );
                }
            }
        }

        Ok(())
    }
}

// Default value functions
fn default_tick_ms() -> u64 { 20 }
