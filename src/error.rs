//! Error types for swarmsim

use thiserror::Error;

/// Result type for swarmsim operations
pub type Result<T> = std::result::Result<T, SwarmError>;

/// Swarm simulator error types
#[derive(Error, Debug)]
pub enum SwarmError {
    #[error("This node is already part of a swarm")]
    AlreadyInSwarm,

    #[error("This node is not part of a swarm")]
    NotInSwarm,

    #[error("No swarm nodes available")]
    NoNodes,

    #[error("There's already a service with this name: {0}")]
    NameConflict(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Container not found: {0}")]
    InstanceNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Peer {peer} unreachable: {source}")]
    PeerUnreachable {
        peer: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status code in updatenodes from {peer}: {status}")]
    UnexpectedPeerResponse { peer: String, status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SwarmError {
    /// HTTP status code reported to API clients for this error
    pub fn status_code(&self) -> u16 {
        match self {
            SwarmError::AlreadyInSwarm | SwarmError::NotInSwarm | SwarmError::NoNodes => 406,
            SwarmError::NameConflict(_) => 409,
            SwarmError::ServiceNotFound(_)
            | SwarmError::TaskNotFound(_)
            | SwarmError::NodeNotFound(_)
            | SwarmError::InstanceNotFound(_) => 404,
            SwarmError::InvalidArgument(_) => 400,
            SwarmError::PeerUnreachable { .. }
            | SwarmError::UnexpectedPeerResponse { .. }
            | SwarmError::Json(_)
            | SwarmError::Io(_)
            | SwarmError::Config(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SwarmError::AlreadyInSwarm.status_code(), 406);
        assert_eq!(SwarmError::NoNodes.status_code(), 406);
        assert_eq!(SwarmError::NameConflict("web".to_string()).status_code(), 409);
        assert_eq!(SwarmError::TaskNotFound("t".to_string()).status_code(), 404);
        assert_eq!(
            SwarmError::InvalidArgument("empty".to_string()).status_code(),
            400
        );
        assert_eq!(
            SwarmError::UnexpectedPeerResponse {
                peer: "127.0.0.1:1".to_string(),
                status: 503,
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn test_error_message() {
        let err = SwarmError::ServiceNotFound("web".to_string());
        assert_eq!(err.to_string(), "Service not found: web");
    }
}
