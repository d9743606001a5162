//! StateStore: SQLite-backed persistence for kview.
//!
//! Appends pod and node health samples, purges them by age, and serves
//! filtered reads in descending id order. Each call opens its own
//! connection with a bounded busy timeout; the database file runs in WAL
//! mode so readers never block the collector's writes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use tracing::{debug, info, warn};

use crate::error::{StateError, StateResult};
use crate::schema;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// How long a connection waits on a locked database before giving up.
///
/// Calls can block for this long, so async callers go through
/// [`StateStore::spawn_blocking`].
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const INSERT_POD: &str = "
    INSERT INTO pod_health_check (pod, namespace, timestamp, status, message)
    VALUES (?1, ?2, ?3, ?4, ?5)";

const INSERT_NODE: &str = "
    INSERT INTO node_health_check (node, timestamp, status, message, cpu_usage, memory_usage)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const SELECT_POD: &str = "
    SELECT id, pod, namespace, timestamp, status, message
    FROM pod_health_check
    WHERE namespace = ?1 AND pod = ?2
    ORDER BY id DESC";

const SELECT_NODE: &str = "
    SELECT id, node, timestamp, status, message, cpu_usage, memory_usage
    FROM node_health_check
    WHERE node = ?1
    ORDER BY id DESC";

const SELECT_ALL_NODES: &str = "
    SELECT id, node, timestamp, status, message, cpu_usage, memory_usage
    FROM node_health_check
    ORDER BY id DESC";

/// Thread-safe handle to the retention store.
#[derive(Clone)]
pub struct StateStore {
    path: Arc<PathBuf>,
}

impl StateStore {
    /// Open (or create) the store at `path`, switch it to WAL and apply the schema.
    pub fn open(path: &Path) -> StateResult<Self> {
        let store = Self {
            path: Arc::new(path.to_path_buf()),
        };
        let conn = store.connect()?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(map_err!(Open))?;
        drop(conn);

        store.ensure_schema()?;
        info!(?path, journal_mode = %mode, "state store opened");
        Ok(store)
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` on the blocking thread pool so a busy database never
    /// stalls an async worker.
    pub async fn spawn_blocking<F, T>(&self, op: F) -> StateResult<T>
    where
        F: FnOnce(StateStore) -> StateResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(store))
            .await
            .map_err(map_err!(Task))?
    }

    fn connect(&self) -> StateResult<Connection> {
        let conn = Connection::open(self.path.as_path()).map_err(map_err!(Open))?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(map_err!(Open))?;
        Ok(conn)
    }

    /// Create all tables if they don't exist yet.
    pub fn ensure_schema(&self) -> StateResult<()> {
        let conn = self.connect()?;
        for ddl in [
            schema::POD_HEALTH_CHECK,
            schema::NODE_HEALTH_CHECK,
            schema::CONFIG,
        ] {
            conn.execute_batch(ddl).map_err(map_err!(Schema))?;
        }
        debug!("schema ensured (pod_health_check, node_health_check, config)");
        Ok(())
    }

    /// Check that the database answers a trivial query.
    pub fn ping(&self) -> StateResult<()> {
        let conn = self.connect()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(map_err!(Read))?;
        Ok(())
    }

    // ── Pods ───────────────────────────────────────────────────────

    /// Append one pod sample. Returns the assigned id.
    pub fn insert_pod_record(&self, sample: &PodSample) -> StateResult<i64> {
        let conn = self.connect()?;
        conn.execute(
            INSERT_POD,
            params![
                sample.pod,
                sample.namespace,
                sample.timestamp,
                sample.status,
                sample.message
            ],
        )
        .map_err(map_err!(Write))?;
        Ok(conn.last_insert_rowid())
    }

    /// Append a batch of pod samples with one prepared statement.
    ///
    /// A row that fails to insert is logged and skipped. Returns how many
    /// rows were written; only a failure to prepare is an error.
    pub fn insert_pod_records(&self, samples: &[PodSample]) -> StateResult<usize> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(INSERT_POD).map_err(map_err!(Prepare))?;

        let mut inserted = 0;
        for sample in samples {
            let result = stmt.execute(params![
                sample.pod,
                sample.namespace,
                sample.timestamp,
                sample.status,
                sample.message
            ]);
            match result {
                Ok(_) => inserted += 1,
                Err(e) => warn!(
                    pod = %sample.pod,
                    namespace = %sample.namespace,
                    error = %e,
                    "pod sample insert failed"
                ),
            }
        }
        Ok(inserted)
    }

    /// All samples for one pod, newest id first.
    pub fn pod_records(&self, namespace: &str, pod: &str) -> StateResult<Vec<PodHealthRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(SELECT_POD).map_err(map_err!(Prepare))?;
        let rows = stmt
            .query_map(params![namespace, pod], |row| {
                Ok(PodHealthRecord {
                    id: row.get(0)?,
                    pod: row.get(1)?,
                    namespace: row.get(2)?,
                    timestamp: row.get(3)?,
                    status: row.get(4)?,
                    message: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                })
            })
            .map_err(map_err!(Read))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_err!(Read))
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Append one node sample. Returns the assigned id.
    pub fn insert_node_record(&self, sample: &NodeSample) -> StateResult<i64> {
        let conn = self.connect()?;
        conn.execute(
            INSERT_NODE,
            params![
                sample.node,
                sample.timestamp,
                sample.status,
                sample.message,
                sample.cpu_usage_percent,
                sample.memory_usage_percent
            ],
        )
        .map_err(map_err!(Write))?;
        Ok(conn.last_insert_rowid())
    }

    /// Append a batch of node samples with one prepared statement.
    ///
    /// Same failure rules as [`StateStore::insert_pod_records`].
    pub fn insert_node_records(&self, samples: &[NodeSample]) -> StateResult<usize> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(INSERT_NODE).map_err(map_err!(Prepare))?;

        let mut inserted = 0;
        for sample in samples {
            let result = stmt.execute(params![
                sample.node,
                sample.timestamp,
                sample.status,
                sample.message,
                sample.cpu_usage_percent,
                sample.memory_usage_percent
            ]);
            match result {
                Ok(_) => inserted += 1,
                Err(e) => warn!(node = %sample.node, error = %e, "node sample insert failed"),
            }
        }
        Ok(inserted)
    }

    /// All samples for one node, newest id first.
    pub fn node_records(&self, node: &str) -> StateResult<Vec<NodeHealthRecord>> {
        self.query_nodes(SELECT_NODE, Some(node))
    }

    /// Samples for every node, newest id first.
    pub fn all_node_records(&self) -> StateResult<Vec<NodeHealthRecord>> {
        self.query_nodes(SELECT_ALL_NODES, None)
    }

    fn query_nodes(&self, sql: &str, node: Option<&str>) -> StateResult<Vec<NodeHealthRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql).map_err(map_err!(Prepare))?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(NodeHealthRecord {
                id: row.get(0)?,
                node: row.get(1)?,
                timestamp: row.get(2)?,
                status: row.get(3)?,
                message: row.get(4)?,
                cpu_usage_percent: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
                memory_usage_percent: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
            })
        };
        let rows = match node {
            Some(node) => stmt.query_map(params![node], map_row),
            None => stmt.query_map([], map_row),
        }
        .map_err(map_err!(Read))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_err!(Read))
    }

    // ── Retention ──────────────────────────────────────────────────

    /// Delete samples of `kind` older than `window` before now.
    pub fn purge_older_than(&self, kind: RecordKind, window: Duration) -> StateResult<usize> {
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.purge_before(kind, cutoff)
    }

    /// Delete samples of `kind` whose timestamp is strictly before `cutoff`.
    pub fn purge_before(&self, kind: RecordKind, cutoff: DateTime<Utc>) -> StateResult<usize> {
        let conn = self.connect()?;
        let sql = format!("DELETE FROM {} WHERE timestamp < ?1", kind.table());
        let removed = conn
            .execute(&sql, params![format_timestamp(cutoff)])
            .map_err(map_err!(Write))?;
        debug!(%kind, removed, %cutoff, "purged expired samples");
        Ok(removed)
    }

    // ── Config ─────────────────────────────────────────────────────

    /// Insert each entry unless a row with that name already exists.
    ///
    /// Returns how many entries were newly inserted.
    pub fn seed_config_defaults(&self, defaults: &[ConfigEntry]) -> StateResult<usize> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("INSERT OR IGNORE INTO config (name, value, description) VALUES (?1, ?2, ?3)")
            .map_err(map_err!(Prepare))?;

        let mut inserted = 0;
        for entry in defaults {
            let changed = stmt
                .execute(params![entry.name, entry.value, entry.description])
                .map_err(map_err!(Write))?;
            if changed > 0 {
                info!(name = %entry.name, value = %entry.value, "seeded config default");
            }
            inserted += changed;
        }
        Ok(inserted)
    }

    /// Every configuration name mapped to its value.
    pub fn config(&self) -> StateResult<BTreeMap<String, String>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT name, value FROM config")
            .map_err(map_err!(Prepare))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(map_err!(Read))?;
        rows.collect::<Result<BTreeMap<_, _>, _>>()
            .map_err(map_err!(Read))
    }
}
