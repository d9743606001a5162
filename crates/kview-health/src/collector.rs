//! Health collector: the periodic sampling loop.
//!
//! One cycle purges expired samples, then records a verdict for every
//! pod and every node. The loop sleeps for the configured interval
//! between cycles and stops when the shutdown channel fires.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use kview_cluster::ClusterReader;
use kview_state::{NodeSample, PodSample, RecordKind, StateStore, format_timestamp};

use crate::evaluate::{node_verdict, pod_verdict, resource_usage};

/// Default retention window for stored samples.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// What a single cycle accomplished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pods_purged: usize,
    pub nodes_purged: usize,
    pub pods_stored: usize,
    pub nodes_stored: usize,
    /// Steps that failed and were skipped (purges, listings, batch writes).
    pub failures: usize,
}

/// Samples cluster health into the store on a fixed interval.
pub struct HealthCollector {
    cluster: Arc<dyn ClusterReader>,
    store: StateStore,
    interval: Duration,
    retention: Duration,
}

impl HealthCollector {
    pub fn new(cluster: Arc<dyn ClusterReader>, store: StateStore, interval: Duration) -> Self {
        Self {
            cluster,
            store,
            interval,
            retention: DEFAULT_RETENTION,
        }
    }

    /// Override the retention window.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Run cycles until `shutdown` flips or its sender goes away.
    ///
    /// The first cycle starts immediately. A cycle in progress always
    /// finishes before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            retention_secs = self.retention.as_secs(),
            "health collector started"
        );

        loop {
            let report = self.run_cycle().await;
            info!(
                pods_purged = report.pods_purged,
                nodes_purged = report.nodes_purged,
                pods_stored = report.pods_stored,
                nodes_stored = report.nodes_stored,
                failures = report.failures,
                "collection cycle finished"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("health collector shutting down");
                    break;
                }
            }
        }
    }

    /// Execute one purge-and-collect cycle.
    ///
    /// Failures are logged and counted; they never abort the cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let retention = self.retention;
        match self
            .store
            .spawn_blocking(move |store| store.purge_older_than(RecordKind::Pod, retention))
            .await
        {
            Ok(n) => report.pods_purged = n,
            Err(e) => {
                error!(error = %e, "failed to purge expired pod samples");
                report.failures += 1;
            }
        }
        match self
            .store
            .spawn_blocking(move |store| store.purge_older_than(RecordKind::Node, retention))
            .await
        {
            Ok(n) => report.nodes_purged = n,
            Err(e) => {
                error!(error = %e, "failed to purge expired node samples");
                report.failures += 1;
            }
        }

        self.collect_pods(&mut report).await;
        self.collect_nodes(&mut report).await;
        report
    }

    async fn collect_pods(&self, report: &mut CycleReport) {
        let pods = match self.cluster.list_pods().await {
            Ok(pods) => pods,
            Err(e) => {
                error!(error = %e, "failed to list pods");
                report.failures += 1;
                return;
            }
        };

        let timestamp = format_timestamp(Utc::now());
        let samples: Vec<PodSample> = pods
            .iter()
            .map(|pod| {
                let verdict = pod_verdict(pod);
                PodSample {
                    pod: pod.metadata.name.clone().unwrap_or_default(),
                    namespace: pod.metadata.namespace.clone().unwrap_or_default(),
                    timestamp: timestamp.clone(),
                    status: verdict.status,
                    message: verdict.message,
                }
            })
            .collect();

        let count = samples.len();
        match self
            .store
            .spawn_blocking(move |store| store.insert_pod_records(&samples))
            .await
        {
            Ok(n) => report.pods_stored = n,
            Err(e) => {
                error!(error = %e, count, "failed to store pod samples");
                report.failures += 1;
            }
        }
    }

    async fn collect_nodes(&self, report: &mut CycleReport) {
        let nodes = match self.cluster.list_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => {
                error!(error = %e, "failed to list nodes");
                report.failures += 1;
                return;
            }
        };

        let timestamp = format_timestamp(Utc::now());
        let mut samples = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let name = node.metadata.name.clone().unwrap_or_default();
            let usage = match self.cluster.node_usage(&name).await {
                Ok(usage) => Some(usage),
                Err(e) => {
                    warn!(node = %name, error = %e, "node metrics unavailable, recording 0% usage");
                    None
                }
            };

            let verdict = node_verdict(node);
            let (cpu, memory) = resource_usage(node, usage.as_ref());
            samples.push(NodeSample {
                node: name,
                timestamp: timestamp.clone(),
                status: verdict.status,
                message: verdict.message,
                cpu_usage_percent: cpu,
                memory_usage_percent: memory,
            });
        }

        let count = samples.len();
        match self
            .store
            .spawn_blocking(move |store| store.insert_node_records(&samples))
            .await
        {
            Ok(n) => report.nodes_stored = n,
            Err(e) => {
                error!(error = %e, count, "failed to store node samples");
                report.failures += 1;
            }
        }
    }
}
