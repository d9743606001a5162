//! kview-state: retention store for kview.
//!
//! Backed by SQLite via [rusqlite](https://docs.rs/rusqlite), holds two
//! append-only sample logs (pod and node health) and a small key/value
//! configuration table.
//!
//! # Architecture
//!
//! ```text
//! StateStore
//!   ├── pod_health_check    ← collector appends, query service reads
//!   ├── node_health_check   ← collector appends, query service reads
//!   └── config              ← seeded insert-if-absent at startup
//! ```
//!
//! Records are never updated. Retention is enforced by the collector
//! calling `purge_older_than` right before each batch of inserts.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` and opens a fresh
//! connection per operation. Concurrent access from request handlers and
//! the collector is serialized by SQLite itself (WAL journal plus a
//! bounded busy timeout); there is no lock on the Rust side. Swapping the
//! engine for one without that guarantee requires adding a single-writer
//! discipline here.

pub mod error;
pub mod schema;
pub mod store;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
