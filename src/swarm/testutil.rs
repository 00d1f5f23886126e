//! Multi-node cluster fixtures for tests

use super::cluster::ClusterState;
use crate::config::SimulatorConfig;
use std::sync::Arc;

/// Start a swarm of `size` members over loopback peer listeners.
///
/// The first member initializes the swarm, the others join through it.
pub(crate) async fn start_cluster(size: usize) -> Vec<Arc<ClusterState>> {
    let leader = Arc::new(ClusterState::new(SimulatorConfig::default()));
    leader.init_cluster("127.0.0.1:0", "").await.unwrap();
    let remote = leader.peer_addr().await.unwrap().to_string();

    let mut members = vec![leader];
    for _ in 1..size {
        let member = Arc::new(ClusterState::new(SimulatorConfig::default()));
        member
            .join_cluster(&[remote.clone()], "127.0.0.1:0", "")
            .await
            .unwrap();
        members.push(member);
    }
    members
}
