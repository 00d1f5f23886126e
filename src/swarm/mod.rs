//! Simulated Docker Swarm cluster
//!
//! Holds the cluster state of one simulated manager, replicates node
//! membership between managers over a small internal HTTP protocol and
//! schedules service tasks round-robin over the known nodes.

pub mod cluster;
pub mod filter;
pub mod membership;
pub mod node;
pub mod peer;
pub mod scheduler;
pub mod service;
pub mod task;

#[cfg(test)]
pub(crate) mod testutil;

use uuid::Uuid;

pub use cluster::{ClusterState, JoinTokens, Swarm};
pub use filter::Filters;
pub use membership::{Delivery, NodeOpKind, NodeOperation, PeerClient};
pub use node::{Node, NodeRole, NodeSpec, NodeState};
pub use peer::PeerListener;
pub use scheduler::RoundRobin;
pub use service::{Service, ServiceMode, ServiceSpec};
pub use task::{Task, TaskState};

/// Generate an opaque identifier for swarms, nodes, services, tasks and
/// process instances
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
