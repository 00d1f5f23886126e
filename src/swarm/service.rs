//! Swarm service management

use super::generate_id;
use crate::error::{Result, SwarmError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Swarm service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
    /// Service ID
    #[serde(rename = "ID")]
    pub id: String,
    /// Service specification
    pub spec: ServiceSpec,
    /// Service version
    pub version: ServiceVersion,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// Create a new service
    pub fn new(spec: ServiceSpec) -> Self {
        let now = Utc::now();

        Self {
            id: generate_id(),
            spec,
            version: ServiceVersion { index: 1 },
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the service specification wholesale
    pub fn update(&mut self, new_spec: ServiceSpec) {
        self.spec = new_spec;
        self.version.index += 1;
        self.updated_at = Utc::now();
    }

    /// Check whether `id_or_name` refers to this service
    pub fn matches(&self, id_or_name: &str) -> bool {
        self.id == id_or_name || self.spec.name == id_or_name
    }
}

/// Service specification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSpec {
    /// Service name
    #[serde(default)]
    pub name: String,
    /// Labels
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Task template
    #[serde(default)]
    pub task_template: TaskSpec,
    /// Service mode, replicated with one replica when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ServiceMode>,
    /// Endpoint specification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_spec: Option<EndpointSpec>,
}

/// Largest replica count a replicated service may ask for
pub const MAX_REPLICAS: u64 = 10_000;

impl ServiceSpec {
    /// Number of tasks this spec asks for on a cluster of `node_count` nodes.
    ///
    /// Global mode wins over replicated mode. A mode naming neither, or a
    /// replicated mode without a count, asks for one task.
    pub fn desired_tasks(&self, node_count: usize) -> Result<usize> {
        if self.is_global() {
            return Ok(node_count);
        }
        let replicas = self
            .mode
            .as_ref()
            .and_then(|m| m.replicated.as_ref())
            .and_then(|r| r.replicas)
            .unwrap_or(1);
        if replicas > MAX_REPLICAS {
            return Err(SwarmError::InvalidArgument(format!(
                "replica count {} exceeds the maximum of {}",
                replicas, MAX_REPLICAS
            )));
        }
        usize::try_from(replicas).map_err(|_| {
            SwarmError::InvalidArgument(format!("replica count {} is out of range", replicas))
        })
    }

    /// Check if this is a global service
    pub fn is_global(&self) -> bool {
        self.mode.as_ref().is_some_and(|m| m.global.is_some())
    }

    /// Published ports of the service endpoint
    pub fn ports(&self) -> &[PortConfig] {
        self.endpoint_spec
            .as_ref()
            .map(|e| e.ports.as_slice())
            .unwrap_or(&[])
    }
}

/// Task specification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskSpec {
    /// Container spec
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_spec: Option<ContainerSpec>,
}

/// Container specification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSpec {
    /// Image
    #[serde(default)]
    pub image: String,
    /// Labels
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Command
    #[serde(default)]
    pub command: Vec<String>,
    /// Args
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables
    #[serde(default)]
    pub env: Vec<String>,
    /// Working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// User
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Service mode. Docker clients send `{}` when no mode is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceMode {
    /// Replicated service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicated: Option<ReplicatedService>,
    /// Global service (one per node)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalService>,
}

impl ServiceMode {
    /// Replicated mode with `replicas` tasks
    pub fn replicated(replicas: Option<u64>) -> Self {
        Self {
            replicated: Some(ReplicatedService { replicas }),
            global: None,
        }
    }

    /// Global mode
    pub fn global() -> Self {
        Self {
            replicated: None,
            global: Some(GlobalService {}),
        }
    }
}

/// Replicated service mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicatedService {
    /// Number of tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u64>,
}

/// Global service mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalService {}

/// Endpoint specification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointSpec {
    /// Mode (vip, dnsrr)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Ports
    #[serde(default)]
    pub ports: Vec<PortConfig>,
}

/// Port configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortConfig {
    /// Name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Protocol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Target port
    pub target_port: u16,
    /// Published port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_port: Option<u16>,
    /// Publish mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_mode: Option<String>,
}

/// Service version
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceVersion {
    /// Index
    pub index: u64,
}
