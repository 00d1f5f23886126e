//! swarmsim daemon
//!
//! Serves a Docker Engine compatible REST API for the simulated swarm over
//! TCP. Each member of a simulated cluster runs one daemon.

mod api;
mod server;

pub use api::{router, ApiState, InitRequest, JoinRequest, API_VERSION};
pub use server::SwarmDaemon;
