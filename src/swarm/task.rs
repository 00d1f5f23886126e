//! Swarm task management

use super::generate_id;
use super::service::{Service, TaskSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Task is new
    #[default]
    New,
    /// Task is pending
    Pending,
    /// Task is assigned
    Assigned,
    /// Task is ready
    Ready,
    /// Task is running
    Running,
    /// Task completed
    Complete,
    /// Task shutdown
    Shutdown,
    /// Task failed
    Failed,
}

impl TaskState {
    /// Docker API name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::New => "new",
            TaskState::Pending => "pending",
            TaskState::Assigned => "assigned",
            TaskState::Ready => "ready",
            TaskState::Running => "running",
            TaskState::Complete => "complete",
            TaskState::Shutdown => "shutdown",
            TaskState::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Swarm task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    /// Task ID
    #[serde(rename = "ID")]
    pub id: String,
    /// Service ID
    #[serde(rename = "ServiceID")]
    pub service_id: String,
    /// Node ID
    #[serde(rename = "NodeID")]
    pub node_id: String,
    /// Slot (for replicated services)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u64>,
    /// Copy of the service task template at scheduling time
    pub spec: TaskSpec,
    /// Task status
    pub status: TaskStatus,
    /// Desired state
    pub desired_state: TaskState,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task of `service` placed on `node_id` and backed by `container_id`
    pub fn scheduled(service: &Service, index: usize, node_id: &str, container_id: &str) -> Self {
        let now = Utc::now();
        let slot = if service.spec.is_global() {
            None
        } else {
            Some(index as u64 + 1)
        };

        Self {
            id: generate_id(),
            service_id: service.id.clone(),
            node_id: node_id.to_string(),
            slot,
            spec: service.spec.task_template.clone(),
            status: TaskStatus {
                timestamp: now,
                state: TaskState::Ready,
                message: String::new(),
                container_status: ContainerStatus {
                    container_id: container_id.to_string(),
                },
            },
            desired_state: TaskState::Ready,
            created_at: now,
        }
    }

    /// ID of the process instance backing this task
    pub fn container_id(&self) -> &str {
        &self.status.container_status.container_id
    }
}

/// Task status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskStatus {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// State
    pub state: TaskState,
    /// Message
    #[serde(default)]
    pub message: String,
    /// Container status
    pub container_status: ContainerStatus,
}

/// Container status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStatus {
    /// Container ID
    #[serde(rename = "ContainerID")]
    pub container_id: String,
}
