//! Peer listener serving the internal membership endpoint

use super::cluster::ClusterState;
use super::membership::{Delivery, NodeOperation, UPDATE_NODES_PATH};
use super::node::Node;
use crate::error::Result;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Secondary HTTP listener of a swarm member.
///
/// Serves only `POST /internal/updatenodes`. The server task stops when the
/// listener is shut down or dropped.
#[derive(Debug)]
pub struct PeerListener {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl PeerListener {
    /// Bind `addr` and start serving membership operations against `state`
    pub async fn bind(addr: &str, state: Arc<ClusterState>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let app = router(state);
            let shutdown = async {
                let _ = rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Peer listener on {} failed: {}", local_addr, e);
            }
        });

        info!("Peer listener bound to {}", local_addr);
        Ok(Self {
            addr: local_addr,
            shutdown: Some(tx),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting peer connections
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
            info!("Peer listener on {} closed", self.addr);
        }
    }
}

impl Drop for PeerListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct UpdateNodesQuery {
    propagate: Option<String>,
}

/// Router of the peer listener
pub fn router(state: Arc<ClusterState>) -> Router {
    Router::new()
        .route(UPDATE_NODES_PATH, post(update_nodes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn update_nodes(
    State(state): State<Arc<ClusterState>>,
    Query(query): Query<UpdateNodesQuery>,
    body: Bytes,
) -> Response {
    let delivery = Delivery::from_query(query.propagate.as_deref());
    match apply_operation(&state, &body, delivery).await {
        Ok(nodes) => Json(nodes).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn apply_operation(
    state: &ClusterState,
    body: &[u8],
    delivery: Delivery,
) -> Result<Vec<Node>> {
    let op: NodeOperation = serde_json::from_slice(body)?;
    state.handle_node_operation(op, delivery).await
}
