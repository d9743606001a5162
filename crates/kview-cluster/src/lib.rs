//! kview-cluster: access to the Kubernetes control plane.
//!
//! Holds the service-account credentials the process runs with and a
//! reader that lists pods and nodes, fetches node metrics, and probes
//! the API server's readiness endpoint.
//!
//! # Architecture
//!
//! ```text
//! ClusterCredentials (token + CA, loaded once at startup)
//!   ├── http_client() → reqwest::Client trusting only the cluster CA
//!   └── bearer()      → Authorization header value
//!
//! ClusterReader (trait)
//!   └── KubeApiReader
//!       ├── GET /api/v1/pods
//!       ├── GET /api/v1/nodes
//!       ├── GET /apis/metrics.k8s.io/v1beta1/nodes/{name}
//!       └── GET /readyz
//! ```
//!
//! Credentials are never refreshed. A rotated token needs a restart.

pub mod credentials;
pub mod error;
pub mod quantity;
pub mod reader;

pub use credentials::{ClusterCredentials, CredentialError};
pub use error::{ClusterError, ClusterResult};
pub use reader::{ClusterReader, KubeApiReader, NodeUsage};

pub use k8s_openapi::api::core::v1::{Node, Pod};
