//! Error types for control-plane reads.

use thiserror::Error;

/// Result type alias for cluster reader operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors returned by a [`crate::ClusterReader`].
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("node {node} reports no {resource} usage")]
    MissingUsage { node: String, resource: &'static str },

    #[error("invalid quantity {0:?}")]
    Quantity(String),
}
