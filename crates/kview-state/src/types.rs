//! Domain types for the kview retention store.
//!
//! Samples (`PodSample`, `NodeSample`) are what the collector writes;
//! records (`PodHealthRecord`, `NodeHealthRecord`) are what readers get
//! back, carrying the id assigned at insert time.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Message stored for a subject that is fully ready.
pub const MESSAGE_OK: &str = "OK";

/// Message stored for a subject that reported itself not ready.
pub const MESSAGE_NOT_OK: &str = "NOT_OK";

/// Message stored for a node with no Ready condition at all.
pub const MESSAGE_UNKNOWN: &str = "UNKNOWN";

/// Which sample log an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Pod,
    Node,
}

impl RecordKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            RecordKind::Pod => "pod_health_check",
            RecordKind::Node => "node_health_check",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Pod => f.write_str("pod"),
            RecordKind::Node => f.write_str("node"),
        }
    }
}

/// Render a timestamp the way the store persists it.
///
/// Always UTC with second precision and a `Z` suffix, so string order
/// matches time order. Retention purges depend on that.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ── Pods ───────────────────────────────────────────────────────────

/// A pod health sample about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct PodSample {
    pub pod: String,
    pub namespace: String,
    pub timestamp: String,
    /// 1 when the pod is Running and every container is ready.
    pub status: u8,
    /// `OK`, `NOT_OK`, or the pod phase when not Running.
    pub message: String,
}

/// A stored pod health sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PodHealthRecord {
    pub id: i64,
    pub pod: String,
    pub namespace: String,
    pub timestamp: String,
    pub status: u8,
    pub message: String,
}

// ── Nodes ──────────────────────────────────────────────────────────

/// A node health sample about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSample {
    pub node: String,
    pub timestamp: String,
    /// 1 when the node's Ready condition is True.
    pub status: u8,
    /// `OK`, `NOT_OK`, or `UNKNOWN`.
    pub message: String,
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
}

/// A stored node health sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeHealthRecord {
    pub id: i64,
    pub node: String,
    pub timestamp: String,
    pub status: u8,
    pub message: String,
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
}

// ── Config ─────────────────────────────────────────────────────────

/// One row of the configuration table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
    pub description: String,
}

impl ConfigEntry {
    pub fn new(name: &str, value: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            description: description.to_string(),
        }
    }
}
