//! Swarm cluster state
//!
//! One [`ClusterState`] is the whole in-memory world of a simulated manager:
//! the swarm identity, the node, service and task registries and the process
//! instances backing tasks. Two locks guard it. The container lock covers the
//! instance registry, the swarm lock covers everything else. Operations that
//! need both take the container lock first.

use super::membership::{Delivery, NodeOperation, PeerClient};
use super::node::{Node, NodeSpec};
use super::peer::PeerListener;
use super::scheduler::RoundRobin;
use super::service::Service;
use super::task::Task;
use super::generate_id;
use crate::config::SimulatorConfig;
use crate::container::{InstanceRegistry, ProcessInstance};
use crate::error::{Result, SwarmError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// Swarm identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Swarm {
    /// Swarm ID
    #[serde(rename = "ID")]
    pub id: String,
    /// Join tokens
    pub join_tokens: JoinTokens,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Swarm {
    /// Create a swarm identity with fresh join tokens
    pub fn new() -> Self {
        let id = generate_id();
        Self {
            join_tokens: JoinTokens {
                worker: generate_token(TokenType::Worker, &id),
                manager: generate_token(TokenType::Manager, &id),
            },
            id,
            created_at: Utc::now(),
        }
    }
}

impl Default for Swarm {
    fn default() -> Self {
        Self::new()
    }
}

/// Join tokens of a swarm
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JoinTokens {
    /// Worker join token
    pub worker: String,
    /// Manager join token
    pub manager: String,
}

/// Join token type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenType {
    Worker,
    Manager,
}

/// Everything guarded by the swarm lock
#[derive(Debug, Default)]
pub(super) struct SwarmRegistry {
    pub(super) swarm: Option<Swarm>,
    pub(super) node_id: Option<String>,
    pub(super) nodes: Vec<Node>,
    pub(super) services: Vec<Service>,
    pub(super) tasks: Vec<Task>,
    pub(super) placement: RoundRobin,
    pub(super) listener: Option<PeerListener>,
}

impl SwarmRegistry {
    /// Fail with `NotInSwarm` unless a swarm is initialized
    pub(super) fn ensure_swarm(&self) -> Result<&Swarm> {
        self.swarm.as_ref().ok_or(SwarmError::NotInSwarm)
    }

    fn node(&self, id: &str) -> Result<&Node> {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| SwarmError::NodeNotFound(id.to_string()))
    }
}

/// Shared state of one simulated swarm manager
#[derive(Debug)]
pub struct ClusterState {
    config: SimulatorConfig,
    pub(super) containers: Mutex<InstanceRegistry>,
    pub(super) swarm: Mutex<SwarmRegistry>,
    pub(super) peers: PeerClient,
    notifier: Option<mpsc::UnboundedSender<ProcessInstance>>,
}

impl ClusterState {
    /// Create an empty, uninitialized cluster state
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            containers: Mutex::new(InstanceRegistry::new()),
            swarm: Mutex::new(SwarmRegistry::default()),
            peers: PeerClient::new(),
            notifier: None,
        }
    }

    /// Send every synthesized process instance to `notifier`
    pub fn with_notifier(mut self, notifier: mpsc::UnboundedSender<ProcessInstance>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub(super) fn notify(&self, instance: &ProcessInstance) {
        debug!(
            "Started instance {} ({}) from image {:?}",
            instance.name, instance.id, instance.image
        );
        if let Some(notifier) = &self.notifier {
            if notifier.send(instance.clone()).is_err() {
                debug!("Instance observer is gone, dropping notification");
            }
        }
    }

    /// Start the peer listener and build this node's description
    async fn start_node(
        self: &Arc<Self>,
        listen_addr: &str,
        advertise_addr: &str,
        leader: bool,
    ) -> Result<(PeerListener, Node)> {
        let (_, listen_port) = split_host_port(listen_addr);
        let bind = format!("{}:{}", self.config.peer_host, listen_port.unwrap_or(0));
        let listener = PeerListener::bind(&bind, Arc::clone(self)).await?;

        let (advertise_host, advertise_port) = split_host_port(advertise_addr);
        let host = if advertise_host.is_empty() {
            self.config.advertise_host.as_str()
        } else {
            advertise_host
        };
        let port = advertise_port.unwrap_or_else(|| listener.local_addr().port());
        let manager_addr = format!("{}:{}", host, port);

        Ok((listener, Node::new_manager(&manager_addr, host, leader)))
    }

    /// Initialize a new swarm with this node as leader and return its node ID
    pub async fn init_cluster(
        self: &Arc<Self>,
        listen_addr: &str,
        advertise_addr: &str,
    ) -> Result<String> {
        let mut guard = self.swarm.lock().await;
        if guard.swarm.is_some() {
            return Err(SwarmError::AlreadyInSwarm);
        }

        let (listener, node) = self.start_node(listen_addr, advertise_addr, true).await?;
        let node_id = node.id.clone();

        // No other members yet, so the add is only applied locally
        NodeOperation::add(node).apply(&mut guard.nodes);
        guard.node_id = Some(node_id.clone());
        guard.listener = Some(listener);
        let swarm = Swarm::new();
        info!("Initialized swarm {} with leader node {}", swarm.id, node_id);
        guard.swarm = Some(swarm);

        Ok(node_id)
    }

    /// Join the swarm reachable at the first of `remote_addrs`
    pub async fn join_cluster(
        self: &Arc<Self>,
        remote_addrs: &[String],
        listen_addr: &str,
        advertise_addr: &str,
    ) -> Result<()> {
        let mut guard = self.swarm.lock().await;
        if guard.swarm.is_some() {
            return Err(SwarmError::AlreadyInSwarm);
        }
        let Some(remote) = remote_addrs.first() else {
            return Err(SwarmError::InvalidArgument(
                "at least one remote address is required".to_string(),
            ));
        };

        let (listener, node) = self.start_node(listen_addr, advertise_addr, false).await?;
        let node_id = node.id.clone();

        let nodes = match self
            .peers
            .send(remote, &NodeOperation::add(node), Delivery::Propagate)
            .await
        {
            Ok(nodes) => nodes,
            Err(e) => {
                listener.shutdown();
                return Err(e);
            }
        };

        info!(
            "Node {} joined swarm through {} ({} members)",
            node_id,
            remote,
            nodes.len()
        );
        guard.nodes = nodes;
        guard.node_id = Some(node_id);
        guard.listener = Some(listener);
        guard.swarm = Some(Swarm::new());

        Ok(())
    }

    /// Leave the swarm. Services, tasks and instances stay registered.
    pub async fn leave_cluster(&self) -> Result<()> {
        let mut guard = self.swarm.lock().await;
        guard.ensure_swarm()?;

        if let Some(listener) = guard.listener.take() {
            listener.shutdown();
        }
        guard.swarm = None;
        guard.nodes.clear();
        if let Some(node_id) = guard.node_id.take() {
            info!("Node {} left the swarm", node_id);
        }

        Ok(())
    }

    /// Inspect the swarm identity
    pub async fn inspect_swarm(&self) -> Result<Swarm> {
        let guard = self.swarm.lock().await;
        guard.ensure_swarm().cloned()
    }

    /// ID of this node, if it is part of a swarm
    pub async fn node_id(&self) -> Option<String> {
        self.swarm.lock().await.node_id.clone()
    }

    /// Address the peer listener is bound to, if it is running
    pub async fn peer_addr(&self) -> Option<SocketAddr> {
        let guard = self.swarm.lock().await;
        guard.listener.as_ref().map(PeerListener::local_addr)
    }

    /// Replace the spec of node `id` on every member
    pub async fn update_node(&self, id: &str, spec: NodeSpec) -> Result<Node> {
        let mut guard = self.swarm.lock().await;
        let registry = &mut *guard;
        registry.ensure_swarm()?;

        let mut node = registry.node(id)?.clone();
        node.set_spec(spec);
        let op = NodeOperation::update(node.clone());

        self.peers
            .announce(&op, &registry.nodes, registry.node_id.as_deref())
            .await?;
        op.apply(&mut registry.nodes);
        info!("Updated node {}", id);

        Ok(node)
    }

    /// Remove node `id` from every member
    pub async fn delete_node(&self, id: &str) -> Result<()> {
        let mut guard = self.swarm.lock().await;
        let registry = &mut *guard;
        registry.ensure_swarm()?;

        let op = NodeOperation::delete(registry.node(id)?.clone());
        self.peers
            .announce(&op, &registry.nodes, registry.node_id.as_deref())
            .await?;
        op.apply(&mut registry.nodes);
        info!("Deleted node {}", id);

        Ok(())
    }

    /// Inspect node `id`
    pub async fn inspect_node(&self, id: &str) -> Result<Node> {
        let guard = self.swarm.lock().await;
        guard.ensure_swarm()?;
        guard.node(id).cloned()
    }

    /// List the known nodes
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        let guard = self.swarm.lock().await;
        guard.ensure_swarm()?;
        Ok(guard.nodes.clone())
    }

    /// List every process instance
    pub async fn list_instances(&self) -> Vec<ProcessInstance> {
        self.containers.lock().await.list().to_vec()
    }

    /// Inspect a process instance by ID or name
    pub async fn inspect_instance(&self, id_or_name: &str) -> Result<ProcessInstance> {
        self.containers.lock().await.get(id_or_name).cloned()
    }
}

/// Split `host:port`, treating a missing or zero port as absent
fn split_host_port(addr: &str) -> (&str, Option<u16>) {
    match addr.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().ok().filter(|p| *p != 0)),
        None => (addr, None),
    }
}

/// Generate a join token
fn generate_token(token_type: TokenType, cluster_id: &str) -> String {
    let type_str = match token_type {
        TokenType::Worker => "worker",
        TokenType::Manager => "manager",
    };

    let random = generate_id();
    format!(
        "SWMTKN-1-{}-{}-{}",
        cluster_id.get(..8).unwrap_or(cluster_id),
        type_str,
        &random[..25]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::node::NodeAvailability;
    use crate::swarm::testutil::start_cluster;
    use std::collections::HashMap;

    #[test]
    fn test_generate_token() {
        let token = generate_token(TokenType::Worker, "abc12345ffff");
        assert!(token.starts_with("SWMTKN-1-abc12345-worker-"));
        assert_eq!(token.len(), "SWMTKN-1-abc12345-worker-".len() + 25);
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("0.0.0.0:2377"), ("0.0.0.0", Some(2377)));
        assert_eq!(split_host_port("127.0.0.1:0"), ("127.0.0.1", None));
        assert_eq!(split_host_port("10.0.0.5"), ("10.0.0.5", None));
        assert_eq!(split_host_port(""), ("", None));
    }

    #[tokio::test]
    async fn test_init_cluster() {
        let state = Arc::new(ClusterState::new(SimulatorConfig::default()));
        let node_id = state.init_cluster("127.0.0.1:0", "").await.unwrap();

        let swarm = state.inspect_swarm().await.unwrap();
        assert!(swarm.join_tokens.worker.contains("-worker-"));
        assert!(swarm.join_tokens.manager.contains("-manager-"));

        let nodes = state.list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, node_id);
        assert!(nodes[0].is_leader());
        assert_eq!(
            nodes[0].peer_addr().map(str::to_string),
            state.peer_addr().await.map(|a| a.to_string())
        );
        assert_eq!(state.node_id().await, Some(node_id));
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let state = Arc::new(ClusterState::new(SimulatorConfig::default()));
        state.init_cluster("127.0.0.1:0", "").await.unwrap();
        assert!(matches!(
            state.init_cluster("127.0.0.1:0", "").await,
            Err(SwarmError::AlreadyInSwarm)
        ));
    }

    #[tokio::test]
    async fn test_operations_require_swarm() {
        let state = Arc::new(ClusterState::new(SimulatorConfig::default()));
        assert!(matches!(state.inspect_swarm().await, Err(SwarmError::NotInSwarm)));
        assert!(matches!(state.list_nodes().await, Err(SwarmError::NotInSwarm)));
        assert!(matches!(state.leave_cluster().await, Err(SwarmError::NotInSwarm)));
        assert!(matches!(
            state.delete_node("x").await,
            Err(SwarmError::NotInSwarm)
        ));
    }

    #[tokio::test]
    async fn test_join_requires_remote() {
        let state = Arc::new(ClusterState::new(SimulatorConfig::default()));
        assert!(matches!(
            state.join_cluster(&[], "127.0.0.1:0", "").await,
            Err(SwarmError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_join_unreachable_leaves_state_unchanged() {
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let remote = closed.local_addr().unwrap().to_string();
        drop(closed);

        let state = Arc::new(ClusterState::new(SimulatorConfig::default()));
        let result = state.join_cluster(&[remote], "127.0.0.1:0", "").await;
        assert!(matches!(result, Err(SwarmError::PeerUnreachable { .. })));
        assert!(state.node_id().await.is_none());
        assert!(state.peer_addr().await.is_none());
        assert!(matches!(state.inspect_swarm().await, Err(SwarmError::NotInSwarm)));
    }

    #[tokio::test]
    async fn test_join_replicates_membership() {
        let members = start_cluster(3).await;

        let mut ids = Vec::new();
        for member in &members {
            ids.push(member.node_id().await.unwrap());
        }

        for member in &members {
            let nodes = member.list_nodes().await.unwrap();
            assert_eq!(nodes.len(), 3);
            assert_eq!(nodes.iter().filter(|n| n.is_leader()).count(), 1);
            for id in &ids {
                assert!(nodes.iter().any(|n| &n.id == id));
            }
        }

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_update_node_reaches_peers() {
        let members = start_cluster(2).await;
        let leader_id = members[0].node_id().await.unwrap();

        let mut labels = HashMap::new();
        labels.insert("zone".to_string(), "b".to_string());
        let spec = NodeSpec {
            name: "renamed".to_string(),
            labels,
            availability: NodeAvailability::Drain,
            ..Default::default()
        };

        members[1].update_node(&leader_id, spec.clone()).await.unwrap();

        for member in &members {
            let node = member.inspect_node(&leader_id).await.unwrap();
            assert_eq!(node.spec, spec);
        }
    }

    #[tokio::test]
    async fn test_unreachable_peer_leaves_node_unchanged() {
        let members = start_cluster(2).await;
        let leader_id = members[0].node_id().await.unwrap();
        let before = members[0].inspect_node(&leader_id).await.unwrap();

        // the second member stops listening but stays in the registry
        members[1].leave_cluster().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let spec = NodeSpec {
            name: "renamed".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            members[0].update_node(&leader_id, spec).await,
            Err(SwarmError::PeerUnreachable { .. })
        ));
        let after = members[0].inspect_node(&leader_id).await.unwrap();
        assert_eq!(after.spec, before.spec);
        assert_eq!(after.updated_at, before.updated_at);

        assert!(matches!(
            members[0].delete_node(&leader_id).await,
            Err(SwarmError::PeerUnreachable { .. })
        ));
        assert_eq!(members[0].list_nodes().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_node_reaches_peers() {
        let members = start_cluster(3).await;
        let victim = members[2].node_id().await.unwrap();

        members[0].delete_node(&victim).await.unwrap();

        for member in &members[..2] {
            let nodes = member.list_nodes().await.unwrap();
            assert_eq!(nodes.len(), 2);
            assert!(matches!(
                member.inspect_node(&victim).await,
                Err(SwarmError::NodeNotFound(_))
            ));
        }
        assert!(matches!(
            members[0].delete_node(&victim).await,
            Err(SwarmError::NodeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_leave_and_reinit() {
        let state = Arc::new(ClusterState::new(SimulatorConfig::default()));
        let first = state.init_cluster("127.0.0.1:0", "").await.unwrap();

        state.leave_cluster().await.unwrap();
        assert!(state.node_id().await.is_none());
        assert!(state.peer_addr().await.is_none());
        assert!(matches!(state.list_nodes().await, Err(SwarmError::NotInSwarm)));

        let second = state.init_cluster("127.0.0.1:0", "").await.unwrap();
        assert_ne!(first, second);
        assert_eq!(state.list_nodes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_advertise_addr_host() {
        let state = Arc::new(ClusterState::new(SimulatorConfig::default()));
        state.init_cluster("127.0.0.1:0", "localhost").await.unwrap();

        let port = state.peer_addr().await.unwrap().port();
        let nodes = state.list_nodes().await.unwrap();
        assert_eq!(nodes[0].peer_addr(), Some(format!("localhost:{}", port).as_str()));
        assert_eq!(nodes[0].status.addr, "localhost");
    }
}
