//! Error types for node healing
//!
//! Errors are `Clone` so that a single-flight fetch can hand the same
//! failure to every caller. Sources that are not `Clone` are kept behind
//! an `Arc`.

use std::sync::Arc;
use thiserror::Error;

/// Node healing errors
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Requested cluster node does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Node provider label has no registered provider
    #[error("Provider not found: {0:?}")]
    ProviderNotFound(String),

    /// Provider authentication failed or returned a malformed response
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// No inventory instance matches the node addresses
    #[error("Instance not found for node {0}")]
    InstanceNotFound(String),

    /// Reboot action returned something other than the accepted status
    #[error("Restart action failed: status={status} resp={body}")]
    RemoteActionFailed { status: u16, body: String },

    /// Network-level failure talking to a remote endpoint
    #[error("Transport error: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// Remote endpoint answered with an unusable status or body
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The run deadline elapsed while waiting on a remote call
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Cluster API failure
    #[error("Cluster error: {0}")]
    Cluster(String),

    /// Provider constructed without a required setting
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Arc::new(err))
    }
}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        Error::Cluster(err.to_string())
    }
}

/// Result type alias for healing operations
pub type Result<T> = std::result::Result<T, Error>;
