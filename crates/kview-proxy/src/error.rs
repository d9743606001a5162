//! Error types for the proxy gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised while forwarding a request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid bearer token: {0}")]
    Token(String),

    #[error("upstream request to {url} failed: {reason}")]
    Upstream { url: String, reason: String },
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_GATEWAY, self.to_string()).into_response()
    }
}
