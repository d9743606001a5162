//! Service-account credentials.
//!
//! Reads the bearer token and the cluster CA bundle once at startup and
//! builds the TLS client every control-plane call goes through.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

/// Token mounted into every pod by the service-account admission plugin.
pub const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// CA bundle that signed the API server's serving certificate.
pub const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while loading credentials or building the client.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("cannot read token file {path}: {reason}")]
    Token { path: PathBuf, reason: String },

    #[error("token file {0} is empty")]
    EmptyToken(PathBuf),

    #[error("cannot read CA file {path}: {reason}")]
    Ca { path: PathBuf, reason: String },

    #[error("invalid CA bundle: {0}")]
    InvalidCa(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Bearer token plus CA trust material. Read-only after construction.
#[derive(Clone)]
pub struct ClusterCredentials {
    token: Arc<str>,
    ca_pem: Arc<[u8]>,
}

impl ClusterCredentials {
    /// Build credentials from in-memory material. The token is trimmed.
    pub fn new(token: &str, ca_pem: Vec<u8>) -> Self {
        Self {
            token: Arc::from(token.trim()),
            ca_pem: Arc::from(ca_pem),
        }
    }

    /// Read the token and CA bundle from disk.
    pub fn load(token_path: &Path, ca_path: &Path) -> Result<Self, CredentialError> {
        let token = std::fs::read_to_string(token_path).map_err(|e| CredentialError::Token {
            path: token_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if token.trim().is_empty() {
            return Err(CredentialError::EmptyToken(token_path.to_path_buf()));
        }

        let ca_pem = std::fs::read(ca_path).map_err(|e| CredentialError::Ca {
            path: ca_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!(token = ?token_path, ca = ?ca_path, "cluster credentials loaded");
        Ok(Self::new(&token, ca_pem))
    }

    /// Read credentials from the standard service-account mount.
    pub fn in_cluster() -> Result<Self, CredentialError> {
        Self::load(
            Path::new(SERVICE_ACCOUNT_TOKEN),
            Path::new(SERVICE_ACCOUNT_CA),
        )
    }

    /// The raw bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// An HTTP client that trusts only the cluster CA.
    pub fn http_client(&self) -> Result<reqwest::Client, CredentialError> {
        let certs = reqwest::Certificate::from_pem_bundle(&self.ca_pem)
            .map_err(|e| CredentialError::InvalidCa(e.to_string()))?;
        if certs.is_empty() {
            return Err(CredentialError::InvalidCa(
                "no certificates found in bundle".to_string(),
            ));
        }

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .connect_timeout(CONNECT_TIMEOUT);
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
        builder
            .build()
            .map_err(|e| CredentialError::Client(e.to_string()))
    }
}

impl fmt::Debug for ClusterCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterCredentials")
            .field("token", &"<redacted>")
            .field("ca_bytes", &self.ca_pem.len())
            .finish()
    }
}
