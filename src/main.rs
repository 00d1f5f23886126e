//! swarmsim - An in-memory Docker Swarm cluster simulator
//!
//! This is the main CLI entry point for swarmsim.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use swarmsim::config::SimulatorConfig;
use swarmsim::daemon::SwarmDaemon;
use tracing_subscriber::EnvFilter;

/// swarmsim - Docker Swarm cluster simulator
#[derive(Parser)]
#[command(name = "swarmsim")]
#[command(version)]
#[command(about = "An in-memory Docker Swarm cluster simulator", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address of the API, overrides the configuration file
    #[arg(short, long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimulatorConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => SimulatorConfig::default(),
    };
    if let Some(addr) = cli.addr {
        config.api_addr = addr;
    }

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(&config.log_level)
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    SwarmDaemon::new(config)
        .run()
        .await
        .context("swarmsim daemon failed")?;

    Ok(())
}
