//! Daemon configuration.
//!
//! `ServeArgs` is what clap parses; `ServeConfig` is the validated form
//! every subsystem is built from.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::ensure;
use clap::Args;
use kview_cluster::credentials::{SERVICE_ACCOUNT_CA, SERVICE_ACCOUNT_TOKEN};

pub const DEFAULT_DB_PATH: &str = "./k8s.db";

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Port to listen on.
    #[arg(long, env = "KVIEW_PORT", default_value = "8080")]
    pub port: u16,

    /// Path prefix for every route, proxied or not.
    #[arg(long, env = "KVIEW_PREFIX", default_value = "/proxy/v1/")]
    pub prefix: String,

    /// Base URL of the Kubernetes API server.
    #[arg(long, env = "KVIEW_API_SERVER", default_value = "https://kubernetes.default.svc")]
    pub api_server: String,

    /// SQLite database file.
    #[arg(long, env = "KVIEW_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// Service-account bearer token.
    #[arg(long, env = "KVIEW_TOKEN_FILE", default_value = SERVICE_ACCOUNT_TOKEN)]
    pub token_file: PathBuf,

    /// CA bundle for the API server certificate.
    #[arg(long, env = "KVIEW_CA_FILE", default_value = SERVICE_ACCOUNT_CA)]
    pub ca_file: PathBuf,

    /// Seconds between collection cycles.
    #[arg(long, env = "KVIEW_INTERVAL", default_value = "30")]
    pub interval: u64,

    /// Seconds of history to keep.
    #[arg(long, env = "KVIEW_RETENTION", default_value = "3600")]
    pub retention: u64,

    /// Seconds the liveness check waits for the API server.
    #[arg(long, env = "KVIEW_PROBE_TIMEOUT", default_value = "3")]
    pub probe_timeout: u64,
}

/// Validated serve configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServeConfig {
    pub port: u16,
    pub prefix: String,
    pub api_server: String,
    pub db_path: PathBuf,
    pub token_file: PathBuf,
    pub ca_file: PathBuf,
    pub interval: Duration,
    pub retention: Duration,
    pub probe_timeout: Duration,
}

impl TryFrom<ServeArgs> for ServeConfig {
    type Error = anyhow::Error;

    fn try_from(args: ServeArgs) -> anyhow::Result<Self> {
        ensure!(args.interval > 0, "--interval must be greater than zero");
        ensure!(args.retention > 0, "--retention must be greater than zero");
        ensure!(args.probe_timeout > 0, "--probe-timeout must be greater than zero");

        let api_server = args.api_server.trim().trim_end_matches('/').to_string();
        ensure!(
            api_server.starts_with("http://") || api_server.starts_with("https://"),
            "--api-server must be an http(s) URL, got {:?}",
            args.api_server
        );

        Ok(Self {
            port: args.port,
            prefix: normalize_prefix(&args.prefix),
            api_server,
            db_path: args.db_path,
            token_file: args.token_file,
            ca_file: args.ca_file,
            interval: Duration::from_secs(args.interval),
            retention: Duration::from_secs(args.retention),
            probe_timeout: Duration::from_secs(args.probe_timeout),
        })
    }
}

/// Force a leading and trailing `/`.
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        serve: ServeArgs,
    }

    fn parse(args: &[&str]) -> ServeArgs {
        let argv = std::iter::once("kviewd").chain(args.iter().copied());
        TestCli::try_parse_from(argv).unwrap().serve
    }

    #[test]
    fn prefix_normalization() {
        assert_eq!(normalize_prefix("/proxy/v1/"), "/proxy/v1/");
        assert_eq!(normalize_prefix("proxy/v1"), "/proxy/v1/");
        assert_eq!(normalize_prefix(" /api "), "/api/");
        assert_eq!(normalize_prefix(""), "/");
        assert_eq!(normalize_prefix("/"), "/");
    }

    #[test]
    fn defaults_match_in_cluster_deployment() {
        let config = ServeConfig::try_from(parse(&[])).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.prefix, "/proxy/v1/");
        assert_eq!(config.api_server, "https://kubernetes.default.svc");
        assert_eq!(config.db_path, PathBuf::from("./k8s.db"));
        assert_eq!(config.token_file, PathBuf::from(SERVICE_ACCOUNT_TOKEN));
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.retention, Duration::from_secs(3600));
        assert_eq!(config.probe_timeout, Duration::from_secs(3));
    }

    #[test]
    fn explicit_flags_are_validated() {
        let config = ServeConfig::try_from(parse(&[
            "--port",
            "9090",
            "--prefix",
            "kview",
            "--api-server",
            "https://10.0.0.1:6443/",
            "--interval",
            "10",
        ]))
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.prefix, "/kview/");
        assert_eq!(config.api_server, "https://10.0.0.1:6443");
        assert_eq!(config.interval, Duration::from_secs(10));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = ServeConfig::try_from(parse(&["--interval", "0"])).unwrap_err();
        assert!(err.to_string().contains("--interval"));
    }

    #[test]
    fn zero_retention_is_rejected() {
        let err = ServeConfig::try_from(parse(&["--retention", "0"])).unwrap_err();
        assert!(err.to_string().contains("--retention"));
    }

    #[test]
    fn api_server_must_be_http() {
        let err = ServeConfig::try_from(parse(&["--api-server", "kubernetes.default.svc"]))
            .unwrap_err();
        assert!(err.to_string().contains("--api-server"));
    }
}
