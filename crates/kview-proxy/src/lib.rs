//! kview proxy gateway: authenticated pass-through to the Kubernetes API.
//!
//! Any request under the configured prefix that no query route claims is
//! re-issued against the API server with the service-account token,
//! and the upstream response is streamed back unchanged.
//!
//! # Components
//!
//! - **`gateway`**: URL rewriting, header filtering, streaming forward
//! - **`cors`**: permissive CORS headers shared with the query routes

pub mod cors;
pub mod error;
pub mod gateway;

pub use cors::with_cors;
pub use error::ProxyError;
pub use gateway::{ProxyGateway, proxy_router};
