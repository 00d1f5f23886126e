//! swarmsim - An in-memory Docker Swarm cluster simulator
//!
//! swarmsim models the manager side of a Docker Swarm cluster without
//! running anything. It provides:
//!
//! - Swarm init, join and leave with node membership replicated between
//!   simulated managers
//! - Services scheduled round-robin into tasks and simulated containers
//! - Docker Engine compatible REST endpoints for swarms, services, tasks,
//!   nodes and containers

pub mod config;
pub mod container;
pub mod daemon;
pub mod error;
pub mod swarm;

pub use error::{Result, SwarmError};
