//! Simulated containers
//!
//! Every swarm task is backed by a process instance synthesized from the
//! service spec. Instances never run anything; they only carry the fields a
//! Docker client expects to inspect.

pub mod config;
pub mod instance;
pub mod lifecycle;

pub use config::{ContainerConfig, ContainerState, HostConfig, PortBinding};
pub use instance::ProcessInstance;
pub use lifecycle::InstanceRegistry;
