//! Container configuration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Host IP every published port binds to
pub const DEFAULT_HOST_IP: &str = "0.0.0.0";

/// Protocol used when a port config does not name one
pub const DEFAULT_PROTOCOL: &str = "tcp";

/// Container configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    /// Entry point
    #[serde(default)]
    pub entrypoint: Vec<String>,
    /// Command to run
    #[serde(default)]
    pub cmd: Vec<String>,
    /// Environment variables
    #[serde(default)]
    pub env: Vec<String>,
    /// Exposed ports, keyed `<port>/<protocol>`
    #[serde(default)]
    pub exposed_ports: BTreeMap<String, ExposedPort>,
}

/// Marker value of an exposed port, encoded as `{}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedPort {}

/// Host side configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    /// Port bindings, keyed `<port>/<protocol>`
    #[serde(default)]
    pub port_bindings: BTreeMap<String, Vec<PortBinding>>,
}

/// Port binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// Host IP
    #[serde(rename = "HostIp")]
    pub host_ip: String,
    /// Host port
    #[serde(rename = "HostPort")]
    pub host_port: String,
}

/// Container runtime state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    /// Is running
    pub running: bool,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Process ID
    pub pid: u32,
    /// Exit code
    pub exit_code: i32,
}

/// Key used for a port in exposed ports and port bindings
pub fn port_key(target_port: u16, protocol: Option<&str>) -> String {
    let protocol = match protocol {
        Some(p) if !p.is_empty() => p,
        _ => DEFAULT_PROTOCOL,
    };
    format!("{}/{}", target_port, protocol)
}
