//! SQLite schema for the kview retention store.
//!
//! Every statement is `IF NOT EXISTS`, so applying the schema is
//! idempotent and safe on every startup.

use crate::types::ConfigEntry;

/// Pod health samples, one row per pod per collection cycle.
pub const POD_HEALTH_CHECK: &str = "
    CREATE TABLE IF NOT EXISTS pod_health_check (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pod TEXT NOT NULL,
        namespace TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        status INTEGER NOT NULL,
        message TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_pod_health_subject
        ON pod_health_check (namespace, pod);
";

/// Node health samples, one row per node per collection cycle.
pub const NODE_HEALTH_CHECK: &str = "
    CREATE TABLE IF NOT EXISTS node_health_check (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        node TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        status INTEGER NOT NULL,
        message TEXT NOT NULL,
        cpu_usage REAL DEFAULT 0,
        memory_usage REAL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_node_health_subject
        ON node_health_check (node);
";

/// Operator-editable settings keyed by unique name.
pub const CONFIG: &str = "
    CREATE TABLE IF NOT EXISTS config (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        value TEXT NOT NULL,
        description TEXT NOT NULL
    );
";

/// Settings inserted on first run. Existing rows are never overwritten.
pub fn default_config() -> Vec<ConfigEntry> {
    vec![
        ConfigEntry::new(
            "monitoring_history_time",
            "7 days",
            "Time to keep monitoring history",
        ),
        ConfigEntry::new("timezone", "utc", "Server timezone"),
        ConfigEntry::new(
            "health_check_history_interval",
            "5 min",
            "Interval between health checks",
        ),
    ]
}
