//! Query handlers.
//!
//! Each handler validates its parameters, reads via `StateStore` on the
//! blocking pool and returns JSON. Storage errors are logged here and surface to callers
//! only as a fixed message.

use axum::Json;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::ApiState;

const POD_PARAMS_REQUIRED: &str = "query params required: ?namespace=xxx&pod=yyy";
const NODE_PARAM_REQUIRED: &str = "query param required: ?node=<node-name>";
const POD_FETCH_FAILED: &str = "Failed to fetch health";
const NODE_FETCH_FAILED: &str = "Failed to fetch node health";
const CONFIG_FETCH_FAILED: &str = "Failed to get configs";
const ALIVE: &str = "database and K8S API are alive";

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (status, Json(ErrorBody { error: msg })).into_response()
}

/// Aggregate liveness verdict.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LivenessReport {
    pub status: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
}

/// First value of `name` in a raw query string.
///
/// Repeated keys resolve to their first occurrence, and `?x=` counts as
/// a missing `x`.
fn required(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

// ── Liveness ───────────────────────────────────────────────────

/// GET {prefix}health
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let (code, message) = match liveness(&state).await {
        Ok(()) => (StatusCode::OK, ALIVE.to_string()),
        Err(message) => {
            warn!(%message, "liveness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, message)
        }
    };

    let report = LivenessReport {
        status: if code.is_success() { "healthy" } else { "unhealthy" }.to_string(),
        status_code: code.as_u16(),
        message,
    };
    (code, Json(report))
}

/// Storage first; the upstream probe only runs when storage answered.
async fn liveness(state: &ApiState) -> Result<(), String> {
    state
        .store
        .spawn_blocking(|store| store.ping())
        .await
        .map_err(|e| format!("Database error: {e}"))?;

    match tokio::time::timeout(state.probe_timeout, state.cluster.readiness()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("K8S API error: {e}")),
        Err(_) => Err(format!(
            "K8S API error: readiness probe timed out after {:?}",
            state.probe_timeout
        )),
    }
}

// ── Config ─────────────────────────────────────────────────────

/// GET {prefix}config
pub async fn config(State(state): State<ApiState>) -> Response {
    match state.store.spawn_blocking(|store| store.config()).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => {
            error!(error = %e, "failed to read config");
            error_response(CONFIG_FETCH_FAILED, StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// ── Pods ───────────────────────────────────────────────────────

/// GET {prefix}pod?namespace=..&pod=..
pub async fn pod_health(State(state): State<ApiState>, RawQuery(query): RawQuery) -> Response {
    let query = query.as_deref();
    let (Some(namespace), Some(pod)) = (required(query, "namespace"), required(query, "pod"))
    else {
        return error_response(POD_PARAMS_REQUIRED, StatusCode::BAD_REQUEST);
    };

    let (ns, name) = (namespace.clone(), pod.clone());
    match state
        .store
        .spawn_blocking(move |store| store.pod_records(&ns, &name))
        .await
    {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            error!(%namespace, %pod, error = %e, "failed to query pod health");
            error_response(POD_FETCH_FAILED, StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// ── Nodes ──────────────────────────────────────────────────────

/// GET {prefix}node?node=..
pub async fn node_health(State(state): State<ApiState>, RawQuery(query): RawQuery) -> Response {
    let Some(node) = required(query.as_deref(), "node") else {
        return error_response(NODE_PARAM_REQUIRED, StatusCode::BAD_REQUEST);
    };

    let name = node.clone();
    match state
        .store
        .spawn_blocking(move |store| store.node_records(&name))
        .await
    {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            error!(%node, error = %e, "failed to query node health");
            error_response(NODE_FETCH_FAILED, StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// OPTIONS on any query route.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
