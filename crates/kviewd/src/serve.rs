//! `serve` and `migrate`: subsystem assembly for the daemon.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;

use kview_api::{ApiState, build_router};
use kview_cluster::{ClusterCredentials, ClusterReader, KubeApiReader};
use kview_health::HealthCollector;
use kview_proxy::ProxyGateway;
use kview_state::{StateStore, schema};

use crate::config::ServeConfig;
use crate::signal;

/// Open the store, apply the schema and seed configuration defaults.
pub fn prepare_store(db_path: &Path) -> anyhow::Result<StateStore> {
    let store = StateStore::open(db_path)
        .with_context(|| format!("failed to open state store at {}", db_path.display()))?;
    let seeded = store
        .seed_config_defaults(&schema::default_config())
        .context("failed to seed configuration defaults")?;
    info!(seeded, "configuration defaults applied");
    Ok(store)
}

/// `kviewd migrate`
pub fn migrate(db_path: &Path) -> anyhow::Result<()> {
    prepare_store(db_path)?;
    info!(path = ?db_path, "migration complete");
    Ok(())
}

/// `kviewd serve`: runs until SIGINT or SIGTERM.
pub async fn serve(config: ServeConfig) -> anyhow::Result<()> {
    info!(
        port = config.port,
        prefix = %config.prefix,
        api_server = %config.api_server,
        "kview daemon starting"
    );

    // ── Credentials and transport ──────────────────────────────

    let credentials = ClusterCredentials::load(&config.token_file, &config.ca_file)
        .context("failed to load service-account credentials")?;
    let client = credentials
        .http_client()
        .context("failed to build control-plane HTTP client")?;

    // ── Storage ────────────────────────────────────────────────

    let store = prepare_store(&config.db_path)?;

    // ── Collector ──────────────────────────────────────────────

    let cluster: Arc<dyn ClusterReader> = Arc::new(KubeApiReader::new(
        client.clone(),
        &config.api_server,
        &credentials,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let collector = HealthCollector::new(cluster.clone(), store.clone(), config.interval)
        .with_retention(config.retention);
    let collector_handle = tokio::spawn(async move {
        collector.run(shutdown_rx).await;
    });

    // ── HTTP server ────────────────────────────────────────────

    let gateway = ProxyGateway::new(client, &config.api_server, &config.prefix, &credentials)
        .context("failed to build proxy gateway")?;
    let router = build_router(
        ApiState {
            store,
            cluster,
            probe_timeout: config.probe_timeout,
        },
        gateway,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, prefix = %config.prefix, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            signal::shutdown().await;
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("HTTP server failed")?;

    collector_handle
        .await
        .context("health collector task panicked")?;

    info!("kview daemon stopped");
    Ok(())
}
