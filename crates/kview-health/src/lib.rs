//! kview-health: periodic health sampling for pods and nodes.
//!
//! Turns live cluster state into status records and appends them to the
//! retention store, purging expired samples first.
//!
//! # Architecture
//!
//! ```text
//! HealthCollector::run()
//!   └── every interval: run_cycle()
//!       ├── purge pod samples older than retention
//!       ├── purge node samples older than retention
//!       ├── list pods  → pod_verdict()  → insert_pod_records()
//!       └── list nodes → node_verdict() + resource_usage() → insert_node_records()
//! ```
//!
//! Every step logs its own failure and lets the rest of the cycle run.
//! There is no backoff; the next cycle is the retry.

pub mod collector;
pub mod evaluate;

pub use collector::{CycleReport, HealthCollector};
pub use evaluate::{Verdict, node_verdict, pod_verdict, resource_usage, usage_percent};
