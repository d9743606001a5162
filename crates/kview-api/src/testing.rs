//! Test doubles shared by the handler and router tests.

use async_trait::async_trait;
use kview_cluster::{ClusterError, ClusterReader, ClusterResult, Node, NodeUsage, Pod};

#[derive(Debug, Clone, Copy)]
pub enum Readiness {
    Ready,
    Failing,
    Hanging,
}

/// Cluster that only answers the readiness probe.
pub struct FakeCluster {
    pub readiness: Readiness,
}

#[async_trait]
impl ClusterReader for FakeCluster {
    async fn list_pods(&self) -> ClusterResult<Vec<Pod>> {
        Ok(Vec::new())
    }

    async fn list_nodes(&self) -> ClusterResult<Vec<Node>> {
        Ok(Vec::new())
    }

    async fn node_usage(&self, node: &str) -> ClusterResult<NodeUsage> {
        Err(ClusterError::MissingUsage {
            node: node.to_string(),
            resource: "cpu",
        })
    }

    async fn readiness(&self) -> ClusterResult<()> {
        match self.readiness {
            Readiness::Ready => Ok(()),
            Readiness::Failing => Err(ClusterError::Status {
                url: "https://kubernetes.default.svc/readyz".to_string(),
                status: 500,
            }),
            Readiness::Hanging => std::future::pending().await,
        }
    }
}
