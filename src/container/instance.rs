//! Simulated process instances backing swarm tasks

use super::config::{
    port_key, ContainerConfig, ContainerState, ExposedPort, HostConfig, PortBinding,
    DEFAULT_HOST_IP,
};
use crate::swarm::generate_id;
use crate::swarm::service::Service;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Upper bound (exclusive) of simulated process IDs
const MAX_PID: u32 = 50_000;

/// Simulated container running one task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessInstance {
    /// Container ID
    #[serde(rename = "ID")]
    pub id: String,
    /// Container name
    pub name: String,
    /// Image name/tag
    pub image: String,
    /// Creation time
    pub created: DateTime<Utc>,
    /// Container configuration
    pub config: ContainerConfig,
    /// Host configuration
    pub host_config: HostConfig,
    /// Runtime state
    pub state: ContainerState,
}

impl ProcessInstance {
    /// Synthesize a running instance for a task of `service`
    pub fn for_service(service: &Service, name: String) -> Self {
        let mut config = ContainerConfig::default();
        let mut host_config = HostConfig::default();

        for port in service.spec.ports() {
            let key = port_key(port.target_port, port.protocol.as_deref());
            let host_port = port
                .published_port
                .map(|p| p.to_string())
                .unwrap_or_default();
            host_config.port_bindings.insert(
                key.clone(),
                vec![PortBinding {
                    host_ip: DEFAULT_HOST_IP.to_string(),
                    host_port,
                }],
            );
            config.exposed_ports.insert(key, ExposedPort::default());
        }

        let image = match &service.spec.task_template.container_spec {
            Some(spec) => {
                config.entrypoint = spec.command.clone();
                config.cmd = spec.args.clone();
                config.env = spec.env.clone();
                spec.image.clone()
            }
            None => String::new(),
        };

        let now = Utc::now();
        Self {
            id: generate_id(),
            name,
            image,
            created: now,
            config,
            host_config,
            state: ContainerState {
                running: true,
                started_at: now,
                pid: rand::thread_rng().gen_range(0..MAX_PID),
                exit_code: 0,
            },
        }
    }

    /// Check if the instance is running
    pub fn is_running(&self) -> bool {
        self.state.running
    }
}
