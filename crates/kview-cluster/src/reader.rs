//! Cluster reader: the read-only view of the control plane.
//!
//! `ClusterReader` is the seam the collector and the liveness check
//! depend on; `KubeApiReader` implements it over the Kubernetes REST API
//! using the process credentials.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::credentials::ClusterCredentials;
use crate::error::{ClusterError, ClusterResult};
use crate::quantity;

/// Current resource consumption of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeUsage {
    pub cpu_millis: f64,
    pub memory_bytes: f64,
}

/// Read access to cluster state.
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// Every pod in every namespace.
    async fn list_pods(&self) -> ClusterResult<Vec<Pod>>;

    /// Every node.
    async fn list_nodes(&self) -> ClusterResult<Vec<Node>>;

    /// Current CPU and memory usage reported by the metrics API.
    async fn node_usage(&self, node: &str) -> ClusterResult<NodeUsage>;

    /// Succeeds when the API server's readiness endpoint answers 2xx.
    async fn readiness(&self) -> ClusterResult<()>;
}

/// List envelope returned by collection endpoints.
#[derive(Deserialize)]
struct ItemList<T> {
    #[serde(default)]
    items: Vec<T>,
}

/// Body of `metrics.k8s.io/v1beta1` `NodeMetrics`, reduced to what we read.
#[derive(Deserialize)]
struct NodeMetrics {
    #[serde(default)]
    usage: BTreeMap<String, Quantity>,
}

/// [`ClusterReader`] backed by the Kubernetes REST API.
#[derive(Clone)]
pub struct KubeApiReader {
    client: reqwest::Client,
    base_url: String,
    bearer: String,
}

impl KubeApiReader {
    /// Create a reader for the API server at `base_url`.
    ///
    /// `client` must already trust the server's certificate; see
    /// [`ClusterCredentials::http_client`].
    pub fn new(client: reqwest::Client, base_url: &str, credentials: &ClusterCredentials) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer: credentials.bearer(),
        }
    }

    async fn get(&self, path: &str) -> ClusterResult<reqwest::Response> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &self.bearer)
            .send()
            .await
            .map_err(|e| ClusterError::Request {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            debug!(%url, %status, "control plane returned non-2xx");
            return Err(ClusterError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClusterResult<T> {
        let resp = self.get(path).await?;
        let url = resp.url().to_string();
        resp.json::<T>().await.map_err(|e| ClusterError::Decode {
            url,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ClusterReader for KubeApiReader {
    async fn list_pods(&self) -> ClusterResult<Vec<Pod>> {
        let list: ItemList<Pod> = self.get_json("/api/v1/pods").await?;
        debug!(count = list.items.len(), "listed pods");
        Ok(list.items)
    }

    async fn list_nodes(&self) -> ClusterResult<Vec<Node>> {
        let list: ItemList<Node> = self.get_json("/api/v1/nodes").await?;
        debug!(count = list.items.len(), "listed nodes");
        Ok(list.items)
    }

    async fn node_usage(&self, node: &str) -> ClusterResult<NodeUsage> {
        let metrics: NodeMetrics = self
            .get_json(&format!("/apis/metrics.k8s.io/v1beta1/nodes/{node}"))
            .await?;

        let read = |resource: &'static str,
                    parse: fn(&Quantity) -> Option<f64>|
         -> ClusterResult<f64> {
            let raw = metrics.usage.get(resource).ok_or(ClusterError::MissingUsage {
                node: node.to_string(),
                resource,
            })?;
            parse(raw).ok_or_else(|| ClusterError::Quantity(raw.0.clone()))
        };

        Ok(NodeUsage {
            cpu_millis: read("cpu", quantity::cpu_millis)?,
            memory_bytes: read("memory", quantity::bytes)?,
        })
    }

    async fn readiness(&self) -> ClusterResult<()> {
        self.get("/readyz").await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use serde_json::json;

    const TOKEN: &str = "test-token";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TOKEN}"))
    }

    async fn nodes(headers: HeaderMap) -> impl IntoResponse {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        axum::Json(json!({
            "kind": "NodeList",
            "apiVersion": "v1",
            "items": [{
                "metadata": { "name": "worker-1" },
                "status": {
                    "allocatable": { "cpu": "2", "memory": "8Gi" },
                    "conditions": [{ "type": "Ready", "status": "True" }]
                }
            }]
        }))
        .into_response()
    }

    async fn pods(headers: HeaderMap) -> impl IntoResponse {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        axum::Json(json!({
            "kind": "PodList",
            "apiVersion": "v1",
            "items": [
                {
                    "metadata": { "name": "web-1", "namespace": "default" },
                    "status": {
                        "phase": "Running",
                        "containerStatuses": [{
                            "name": "web", "image": "nginx", "imageID": "",
                            "ready": true, "restartCount": 0
                        }]
                    }
                },
                {
                    "metadata": { "name": "job-1", "namespace": "batch" },
                    "status": { "phase": "Pending" }
                }
            ]
        }))
        .into_response()
    }

    async fn node_metrics() -> impl IntoResponse {
        axum::Json(json!({
            "kind": "NodeMetrics",
            "apiVersion": "metrics.k8s.io/v1beta1",
            "metadata": { "name": "worker-1" },
            "usage": { "cpu": "500000000n", "memory": "4194304Ki" }
        }))
    }

    async fn spawn_api_server(readyz: StatusCode) -> String {
        let app = Router::new()
            .route("/api/v1/nodes", get(nodes))
            .route("/api/v1/pods", get(pods))
            .route("/apis/metrics.k8s.io/v1beta1/nodes/worker-1", get(node_metrics))
            .route("/readyz", get(move || async move { readyz }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn reader(base_url: &str, token: &str) -> KubeApiReader {
        let creds = ClusterCredentials::new(token, Vec::new());
        KubeApiReader::new(reqwest::Client::new(), base_url, &creds)
    }

    #[tokio::test]
    async fn lists_nodes_with_bearer_token() {
        let base = spawn_api_server(StatusCode::OK).await;
        let nodes = reader(&base, TOKEN).list_nodes().await.unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].metadata.name.as_deref(), Some("worker-1"));
    }

    #[tokio::test]
    async fn lists_pods_across_namespaces() {
        let base = spawn_api_server(StatusCode::OK).await;
        let pods = reader(&base, TOKEN).list_pods().await.unwrap();

        assert_eq!(pods.len(), 2);
        let phase = pods[1].status.as_ref().and_then(|s| s.phase.as_deref());
        assert_eq!(phase, Some("Pending"));
    }

    #[tokio::test]
    async fn wrong_token_surfaces_status_error() {
        let base = spawn_api_server(StatusCode::OK).await;
        let err = reader(&base, "other").list_nodes().await.unwrap_err();
        assert!(matches!(err, ClusterError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn node_usage_parses_metrics_quantities() {
        let base = spawn_api_server(StatusCode::OK).await;
        let usage = reader(&base, TOKEN).node_usage("worker-1").await.unwrap();

        assert!((usage.cpu_millis - 500.0).abs() < 1e-6);
        assert!((usage.memory_bytes - 4_294_967_296.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn node_usage_for_unknown_node_fails() {
        let base = spawn_api_server(StatusCode::OK).await;
        let err = reader(&base, TOKEN).node_usage("ghost").await.unwrap_err();
        assert!(matches!(err, ClusterError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn readiness_follows_readyz_status() {
        let ready = spawn_api_server(StatusCode::OK).await;
        assert!(reader(&ready, TOKEN).readiness().await.is_ok());

        let not_ready = spawn_api_server(StatusCode::INTERNAL_SERVER_ERROR).await;
        assert!(reader(&not_ready, TOKEN).readiness().await.is_err());
    }

    #[tokio::test]
    async fn unreachable_server_is_request_error() {
        let err = reader("http://127.0.0.1:1", TOKEN).readiness().await.unwrap_err();
        assert!(matches!(err, ClusterError::Request { .. }));
    }
}
