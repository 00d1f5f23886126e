//! Simulator configuration

use crate::error::{Result, SwarmError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default address of the client-facing API
pub const DEFAULT_API_ADDR: &str = "127.0.0.1:2375";

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Address the client-facing API listens on
    pub api_addr: String,
    /// Host every peer listener binds to
    pub peer_host: String,
    /// Host advertised in a node's manager address when the request gives none
    pub advertise_host: String,
    /// Log level used when `--debug` is not given
    pub log_level: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            api_addr: DEFAULT_API_ADDR.to_string(),
            peer_host: "127.0.0.1".to_string(),
            advertise_host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| SwarmError::Config(format!("Failed to parse config: {}", e)))
    }
}
