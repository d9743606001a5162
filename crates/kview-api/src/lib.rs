//! kview-api: HTTP surface for kview.
//!
//! Serves the stored health history, the configuration table and an
//! aggregate liveness check. Everything else under the prefix falls
//! through to the proxy gateway.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `{prefix}health` | Storage + API server liveness |
//! | GET | `{prefix}config` | Configuration name → value |
//! | GET | `{prefix}pod?namespace=&pod=` | Pod health history, newest first |
//! | GET | `{prefix}node?node=` | Node health history, newest first |
//! | OPTIONS | any of the above | 200, no body |
//! | * | `{prefix}…` | Proxied to the API server |

pub mod handlers;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use kview_cluster::ClusterReader;
use kview_proxy::{ProxyGateway, proxy_router, with_cors};
use kview_state::StateStore;

/// Default budget for the liveness probe against the API server.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared state for query handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: StateStore,
    pub cluster: Arc<dyn ClusterReader>,
    pub probe_timeout: Duration,
}

/// Build the complete router (query routes + proxy fallthrough + CORS).
///
/// Query routes live under the gateway's prefix and take precedence over
/// the proxy catch-all.
pub fn build_router(state: ApiState, gateway: ProxyGateway) -> Router {
    let prefix = gateway.prefix().to_string();

    let query_routes = Router::new()
        .route(
            &format!("{prefix}health"),
            get(handlers::health).options(handlers::preflight),
        )
        .route(
            &format!("{prefix}config"),
            get(handlers::config).options(handlers::preflight),
        )
        .route(
            &format!("{prefix}pod"),
            get(handlers::pod_health).options(handlers::preflight),
        )
        .route(
            &format!("{prefix}node"),
            get(handlers::node_health).options(handlers::preflight),
        )
        .with_state(state);

    with_cors(query_routes.merge(proxy_router(gateway)))
}
