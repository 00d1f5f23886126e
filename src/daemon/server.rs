//! HTTP server of the simulated swarm manager

use super::api::router;
use crate::config::SimulatorConfig;
use crate::error::Result;
use crate::swarm::ClusterState;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Swarm daemon serving the API on a TCP address
pub struct SwarmDaemon {
    config: SimulatorConfig,
    state: Arc<ClusterState>,
}

impl SwarmDaemon {
    /// Create a new daemon instance
    pub fn new(config: SimulatorConfig) -> Self {
        let state = Arc::new(ClusterState::new(config.clone()));
        Self { config, state }
    }

    /// Shared cluster state
    pub fn state(&self) -> Arc<ClusterState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.api_addr).await?;
        info!("swarmsim daemon listening on {}", listener.local_addr()?);
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve the API on `listener` until `signal` resolves
    pub async fn serve<F>(&self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, router(self.state()))
            .with_graceful_shutdown(signal)
            .await?;

        if self.state.node_id().await.is_some() {
            self.state.leave_cluster().await?;
        }
        info!("swarmsim daemon stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }
}
