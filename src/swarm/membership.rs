//! Node membership replication
//!
//! Changes to the node registry travel between managers as
//! [`NodeOperation`] records posted to every peer listener's
//! `/internal/updatenodes` endpoint. The receiver of a propagating delivery
//! becomes the origin: it forwards the operation to every other member as a
//! terminal delivery, applies it locally and answers with its full registry.
//! Terminal deliveries are applied and never forwarded again.

use super::cluster::ClusterState;
use super::node::Node;
use crate::error::{Result, SwarmError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Path of the internal membership endpoint
pub const UPDATE_NODES_PATH: &str = "/internal/updatenodes";

/// Kind of change to the node registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeOpKind {
    Add,
    Update,
    Delete,
}

/// A node registry change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeOperation {
    pub op: NodeOpKind,
    pub node: Node,
}

impl NodeOperation {
    /// Append `node` to the registry
    pub fn add(node: Node) -> Self {
        Self {
            op: NodeOpKind::Add,
            node,
        }
    }

    /// Replace the registry entry with the same ID as `node`
    pub fn update(node: Node) -> Self {
        Self {
            op: NodeOpKind::Update,
            node,
        }
    }

    /// Remove the registry entry with the same ID as `node`
    pub fn delete(node: Node) -> Self {
        Self {
            op: NodeOpKind::Delete,
            node,
        }
    }

    /// Apply the operation to a node registry
    pub fn apply(&self, nodes: &mut Vec<Node>) {
        match self.op {
            NodeOpKind::Add => nodes.push(self.node.clone()),
            NodeOpKind::Update => {
                if let Some(existing) = nodes.iter_mut().find(|n| n.id == self.node.id) {
                    *existing = self.node.clone();
                }
            }
            NodeOpKind::Delete => {
                if let Some(idx) = nodes.iter().position(|n| n.id == self.node.id) {
                    nodes.remove(idx);
                }
            }
        }
    }
}

/// How the receiver of an operation treats it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Receiver forwards to every other member before applying
    Propagate,
    /// Receiver only applies
    Terminal,
}

impl Delivery {
    /// Parse the `propagate` query value. Anything but `0` propagates.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("0") => Delivery::Terminal,
            _ => Delivery::Propagate,
        }
    }

    /// Value sent in the `propagate` query parameter
    pub fn query_value(self) -> &'static str {
        match self {
            Delivery::Propagate => "1",
            Delivery::Terminal => "0",
        }
    }
}

/// URL of the membership endpoint of the peer at `addr`
pub fn peer_url(addr: &str) -> String {
    let base = addr.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{}{}", base, UPDATE_NODES_PATH)
    } else {
        format!("http://{}{}", base, UPDATE_NODES_PATH)
    }
}

/// HTTP client carrying node operations to peer listeners
#[derive(Debug, Clone)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    /// Create a new peer client. Peers are always contacted directly,
    /// ignoring proxy settings from the environment. If that client cannot be
    /// built, a default client is used instead.
    pub fn new() -> Self {
        let http = match reqwest::Client::builder().no_proxy().build() {
            Ok(http) => http,
            Err(e) => {
                warn!(
                    "Failed to build direct peer client, falling back to defaults: {}",
                    e
                );
                reqwest::Client::new()
            }
        };
        Self { http }
    }

    /// Send `op` to the peer at `peer` and return the peer's node registry
    pub async fn send(
        &self,
        peer: &str,
        op: &NodeOperation,
        delivery: Delivery,
    ) -> Result<Vec<Node>> {
        let url = peer_url(peer);
        debug!(
            "Sending {:?} of node {} to {} (propagate={})",
            op.op,
            op.node.id,
            url,
            delivery.query_value()
        );

        let unreachable = |source| SwarmError::PeerUnreachable {
            peer: peer.to_string(),
            source,
        };

        let response = self
            .http
            .post(&url)
            .query(&[("propagate", delivery.query_value())])
            .json(op)
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(SwarmError::UnexpectedPeerResponse {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(unreachable)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send `op` as a terminal delivery to every member except `self_id`.
    ///
    /// Members are contacted one at a time and the first failure aborts the
    /// fan-out; members already contacted keep the change.
    pub async fn announce(
        &self,
        op: &NodeOperation,
        members: &[Node],
        self_id: Option<&str>,
    ) -> Result<()> {
        for member in members {
            if Some(member.id.as_str()) == self_id {
                continue;
            }
            let Some(addr) = member.peer_addr() else {
                warn!("Node {} has no manager address, skipping", member.id);
                continue;
            };
            if let Err(e) = self.send(addr, op, Delivery::Terminal).await {
                warn!(
                    "Failed to announce {:?} of node {} to {}: {}",
                    op.op, op.node.id, addr, e
                );
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterState {
    /// Handle an operation received on this node's peer listener and return
    /// the resulting node registry
    pub async fn handle_node_operation(
        &self,
        op: NodeOperation,
        delivery: Delivery,
    ) -> Result<Vec<Node>> {
        if delivery == Delivery::Propagate {
            let (self_id, members) = {
                let registry = self.swarm.lock().await;
                (registry.node_id.clone(), registry.nodes.clone())
            };
            self.peers
                .announce(&op, &members, self_id.as_deref())
                .await?;
        }

        let mut registry = self.swarm.lock().await;
        op.apply(&mut registry.nodes);
        info!(
            "Applied {:?} of node {} ({} nodes known)",
            op.op,
            op.node.id,
            registry.nodes.len()
        );
        Ok(registry.nodes.clone())
    }
}
