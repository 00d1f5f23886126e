//! Swarm node management

use super::generate_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node role in the swarm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Worker node
    #[default]
    Worker,
    /// Manager node
    Manager,
}

/// Node state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Node is unknown
    #[default]
    Unknown,
    /// Node is down
    Down,
    /// Node is ready
    Ready,
    /// Node is disconnected
    Disconnected,
}

/// Node availability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeAvailability {
    /// Node is active
    #[default]
    Active,
    /// Node is paused
    Pause,
    /// Node is draining
    Drain,
}

/// User-editable part of a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeSpec {
    /// Node name
    #[serde(default)]
    pub name: String,
    /// Node labels
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Node role
    #[serde(default)]
    pub role: NodeRole,
    /// Node availability
    #[serde(default)]
    pub availability: NodeAvailability,
}

/// Swarm node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    /// Node ID
    #[serde(rename = "ID")]
    pub id: String,
    /// Node spec
    pub spec: NodeSpec,
    /// Node description
    #[serde(default)]
    pub description: NodeDescription,
    /// Node status
    #[serde(default)]
    pub status: NodeStatus,
    /// Manager status (if manager)
    #[serde(default)]
    pub manager_status: Option<ManagerStatus>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Create a manager node whose peer listener is reachable at `manager_addr`
    pub fn new_manager(manager_addr: &str, status_addr: &str, leader: bool) -> Self {
        let hostname = gethostname::gethostname().to_string_lossy().to_string();
        let now = Utc::now();

        Self {
            id: generate_id(),
            spec: NodeSpec {
                role: NodeRole::Manager,
                ..Default::default()
            },
            description: NodeDescription {
                hostname,
                platform: Platform {
                    architecture: std::env::consts::ARCH.to_string(),
                    os: std::env::consts::OS.to_string(),
                },
                resources: Resources {
                    nano_cpus: num_cpus::get() as i64 * 1_000_000_000,
                    memory_bytes: SIMULATED_MEMORY_BYTES,
                },
            },
            status: NodeStatus {
                state: NodeState::Ready,
                message: String::new(),
                addr: status_addr.to_string(),
            },
            manager_status: Some(ManagerStatus {
                leader,
                reachability: "reachable".to_string(),
                addr: manager_addr.to_string(),
            }),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the node spec
    pub fn set_spec(&mut self, spec: NodeSpec) {
        self.spec = spec;
        self.updated_at = Utc::now();
    }

    /// Address of the node's peer listener
    pub fn peer_addr(&self) -> Option<&str> {
        self.manager_status.as_ref().map(|s| s.addr.as_str())
    }

    /// Check if node is a manager
    pub fn is_manager(&self) -> bool {
        self.spec.role == NodeRole::Manager
    }

    /// Check if node is leader
    pub fn is_leader(&self) -> bool {
        self.manager_status
            .as_ref()
            .map(|s| s.leader)
            .unwrap_or(false)
    }

    /// Check if node is ready
    pub fn is_ready(&self) -> bool {
        self.status.state == NodeState::Ready
    }
}

/// Memory reported by every simulated node
const SIMULATED_MEMORY_BYTES: i64 = 8 * 1024 * 1024 * 1024;

/// Node description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeDescription {
    /// Hostname
    pub hostname: String,
    /// Platform info
    pub platform: Platform,
    /// Resources
    pub resources: Resources,
}

/// Platform information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Platform {
    /// CPU architecture
    pub architecture: String,
    /// Operating system
    #[serde(rename = "OS")]
    pub os: String,
}

/// Node resources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resources {
    /// CPU in nanoseconds
    #[serde(rename = "NanoCPUs")]
    pub nano_cpus: i64,
    /// Memory in bytes
    pub memory_bytes: i64,
}

/// Manager status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManagerStatus {
    /// Is leader
    pub leader: bool,
    /// Reachability
    pub reachability: String,
    /// Peer listener address
    pub addr: String,
}

/// Node status
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeStatus {
    /// State
    pub state: NodeState,
    /// Message
    #[serde(default)]
    pub message: String,
    /// Address
    pub addr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_manager_node() {
        let node = Node::new_manager("127.0.0.1:4000", "127.0.0.1", true);
        assert!(node.is_manager());
        assert!(node.is_leader());
        assert!(node.is_ready());
        assert_eq!(node.peer_addr(), Some("127.0.0.1:4000"));
    }

    #[test]
    fn test_node_ids_are_unique() {
        let a = Node::new_manager("127.0.0.1:4000", "127.0.0.1", false);
        let b = Node::new_manager("127.0.0.1:4001", "127.0.0.1", false);
        assert_ne!(a.id, b.id);
        assert!(!a.is_leader());
    }

    #[test]
    fn test_set_spec() {
        let mut node = Node::new_manager("127.0.0.1:4000", "127.0.0.1", false);
        let mut labels = HashMap::new();
        labels.insert("zone".to_string(), "a".to_string());

        node.set_spec(NodeSpec {
            labels,
            availability: NodeAvailability::Drain,
            ..Default::default()
        });

        assert_eq!(node.spec.labels.get("zone"), Some(&"a".to_string()));
        assert_eq!(node.spec.availability, NodeAvailability::Drain);
    }

    #[test]
    fn test_node_json_shape() {
        let node = Node::new_manager("127.0.0.1:4000", "127.0.0.1", true);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["ID"], node.id.as_str());
        assert_eq!(json["ManagerStatus"]["Addr"], "127.0.0.1:4000");
        assert_eq!(json["Spec"]["Role"], "manager");

        let decoded: Node = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.id, node.id);
    }
}
