//! Proxy gateway: forwards prefixed requests to the API server.
//!
//! The prefix is swapped for `/`, the query string is kept verbatim, and
//! the caller's `Authorization` header is replaced with the process
//! token. Request and response bodies are streamed, so watch and
//! `follow=true` log requests work through the gateway.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, HttpBody};
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, CONNECTION, HOST};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use tracing::{debug, warn};

use kview_cluster::ClusterCredentials;

use crate::error::ProxyError;

/// Connection-scoped headers that must not cross the gateway.
const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
];

struct GatewayInner {
    client: reqwest::Client,
    base_url: String,
    prefix: String,
    authorization: HeaderValue,
}

/// Shared forwarding state. Cheap to clone.
#[derive(Clone)]
pub struct ProxyGateway {
    inner: Arc<GatewayInner>,
}

impl ProxyGateway {
    /// Create a gateway forwarding `prefix`ed paths to `base_url`.
    ///
    /// `prefix` is expected to begin and end with `/`.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        prefix: &str,
        credentials: &ClusterCredentials,
    ) -> Result<Self, ProxyError> {
        let mut authorization = HeaderValue::from_str(&credentials.bearer())
            .map_err(|e| ProxyError::Token(e.to_string()))?;
        authorization.set_sensitive(true);

        Ok(Self {
            inner: Arc::new(GatewayInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                prefix: prefix.to_string(),
                authorization,
            }),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    /// Upstream URL for an incoming path and optional raw query.
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> String {
        let rewritten = path.replacen(self.inner.prefix.as_str(), "/", 1);
        match query {
            Some(q) if !q.is_empty() => format!("{}{rewritten}?{q}", self.inner.base_url),
            _ => format!("{}{rewritten}", self.inner.base_url),
        }
    }

    /// Re-issue `request` against the API server and stream back the answer.
    pub async fn forward(&self, request: Request) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();
        let url = self.upstream_url(parts.uri.path(), parts.uri.query());

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(HOST);
        headers.insert(AUTHORIZATION, self.inner.authorization.clone());

        debug!(method = %parts.method, %url, "proxying request");

        let mut upstream = self
            .inner
            .client
            .request(parts.method, &url)
            .headers(headers);
        if body.size_hint().exact() != Some(0) {
            upstream = upstream.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = upstream.send().await.map_err(|e| ProxyError::Upstream {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut response_headers);
        debug!(%url, %status, "upstream responded");

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Remove the fixed hop-by-hop set plus every header the `Connection`
/// header names.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Routes that send everything under the gateway prefix upstream.
///
/// Static routes merged alongside take precedence over the catch-all.
pub fn proxy_router<S>(gateway: ProxyGateway) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let prefix = gateway.prefix().to_string();
    Router::new()
        .route(&prefix, any(forward))
        .route(&format!("{prefix}{{*path}}"), any(forward))
        .with_state(gateway)
}

async fn forward(State(gateway): State<ProxyGateway>, request: Request) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    match gateway.forward(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "proxy request failed");
            e.into_response()
        }
    }
}
