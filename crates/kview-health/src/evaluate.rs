//! Status evaluation: turns raw pod and node objects into verdicts.
//!
//! Everything here is pure apart from a warning on unusable allocatable
//! capacity.

use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use tracing::warn;

use kview_cluster::NodeUsage;
use kview_cluster::quantity;
use kview_state::{MESSAGE_NOT_OK, MESSAGE_OK, MESSAGE_UNKNOWN};

/// Phase reported for a pod whose status carries no phase.
const PHASE_UNKNOWN: &str = "Unknown";

/// Status code plus message for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: u8,
    pub message: String,
}

impl Verdict {
    fn healthy() -> Self {
        Self {
            status: 1,
            message: MESSAGE_OK.to_string(),
        }
    }

    fn unhealthy(message: &str) -> Self {
        Self {
            status: 0,
            message: message.to_string(),
        }
    }
}

/// Evaluate a pod.
///
/// A Running pod is healthy only if every container reports ready; one
/// lagging container makes it `NOT_OK`. Any other phase is unhealthy and
/// the phase itself becomes the message.
pub fn pod_verdict(pod: &Pod) -> Verdict {
    let status = pod.status.as_ref();
    let phase = status
        .and_then(|s| s.phase.as_deref())
        .unwrap_or(PHASE_UNKNOWN);

    if phase != "Running" {
        return Verdict::unhealthy(phase);
    }

    let all_ready = status
        .and_then(|s| s.container_statuses.as_ref())
        .is_none_or(|containers| containers.iter().all(|c| c.ready));

    if all_ready {
        Verdict::healthy()
    } else {
        Verdict::unhealthy(MESSAGE_NOT_OK)
    }
}

/// Evaluate a node from its `Ready` condition.
pub fn node_verdict(node: &Node) -> Verdict {
    let ready = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"));

    match ready {
        Some(c) if c.status == "True" => Verdict::healthy(),
        Some(_) => Verdict::unhealthy(MESSAGE_NOT_OK),
        None => Verdict::unhealthy(MESSAGE_UNKNOWN),
    }
}

/// `used` as a percentage of `allocatable`.
///
/// Returns 0.0 when `allocatable` is zero, negative or not finite.
pub fn usage_percent(used: f64, allocatable: f64) -> f64 {
    if !allocatable.is_finite() || allocatable <= 0.0 {
        return 0.0;
    }
    used / allocatable * 100.0
}

/// CPU and memory usage percentages for a node.
///
/// Without a usage reading both are 0.0. Missing or non-positive
/// allocatable capacity yields 0.0 for that resource and a warning.
pub fn resource_usage(node: &Node, usage: Option<&NodeUsage>) -> (f64, f64) {
    let Some(usage) = usage else {
        return (0.0, 0.0);
    };
    let name = node.metadata.name.as_deref().unwrap_or_default();
    let allocatable = node.status.as_ref().and_then(|s| s.allocatable.as_ref());

    let capacity = |resource: &str, parse: fn(&Quantity) -> Option<f64>| -> f64 {
        let value = allocatable
            .and_then(|a| a.get(resource))
            .and_then(parse)
            .unwrap_or(0.0);
        if !value.is_finite() || value <= 0.0 {
            warn!(node = %name, resource, "node has no usable allocatable capacity, reporting 0%");
        }
        value
    };

    let cpu = usage_percent(usage.cpu_millis, capacity("cpu", quantity::cpu_millis));
    let memory = usage_percent(usage.memory_bytes, capacity("memory", quantity::bytes));
    (cpu, memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::{ContainerStatus, NodeCondition, NodeStatus, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod(phase: Option<&str>, ready: &[bool]) -> Pod {
        let containers = ready
            .iter()
            .enumerate()
            .map(|(i, r)| ContainerStatus {
                name: format!("c{i}"),
                ready: *r,
                ..Default::default()
            })
            .collect();
        Pod {
            metadata: ObjectMeta {
                name: Some("web-1".into()),
                namespace: Some("default".into()),
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: phase.map(str::to_string),
                container_statuses: Some(containers),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn node(ready: Option<&str>, cpu: &str, memory: &str) -> Node {
        let conditions = ready.map(|status| {
            vec![NodeCondition {
                type_: "Ready".into(),
                status: status.into(),
                ..Default::default()
            }]
        });
        let allocatable = BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu.into())),
            ("memory".to_string(), Quantity(memory.into())),
        ]);
        Node {
            metadata: ObjectMeta {
                name: Some("worker-1".into()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions,
                allocatable: Some(allocatable),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn running_pod_with_ready_containers_is_ok() {
        let v = pod_verdict(&pod(Some("Running"), &[true, true]));
        assert_eq!(v, Verdict::healthy());
    }

    #[test]
    fn running_pod_with_unready_container_is_not_ok() {
        let v = pod_verdict(&pod(Some("Running"), &[true, false]));
        assert_eq!(v.status, 0);
        assert_eq!(v.message, "NOT_OK");
    }

    #[test]
    fn non_running_phase_becomes_message() {
        let v = pod_verdict(&pod(Some("Pending"), &[]));
        assert_eq!(v.status, 0);
        assert_eq!(v.message, "Pending");

        let v = pod_verdict(&pod(Some("Succeeded"), &[false]));
        assert_eq!(v.message, "Succeeded");
    }

    #[test]
    fn missing_phase_is_unknown() {
        let v = pod_verdict(&Pod::default());
        assert_eq!(v.status, 0);
        assert_eq!(v.message, "Unknown");
    }

    #[test]
    fn node_ready_condition_drives_verdict() {
        assert_eq!(node_verdict(&node(Some("True"), "2", "8Gi")), Verdict::healthy());

        let v = node_verdict(&node(Some("False"), "2", "8Gi"));
        assert_eq!((v.status, v.message.as_str()), (0, "NOT_OK"));

        let v = node_verdict(&node(None, "2", "8Gi"));
        assert_eq!((v.status, v.message.as_str()), (0, "UNKNOWN"));
    }

    #[test]
    fn usage_percent_handles_bad_capacity() {
        assert_eq!(usage_percent(500.0, 2000.0), 25.0);
        assert_eq!(usage_percent(500.0, 0.0), 0.0);
        assert_eq!(usage_percent(500.0, -1.0), 0.0);
        assert_eq!(usage_percent(500.0, f64::NAN), 0.0);
    }

    #[test]
    fn resource_usage_from_metrics() {
        let n = node(Some("True"), "2", "8Gi");
        let usage = NodeUsage {
            cpu_millis: 500.0,
            memory_bytes: 4.0 * 1024f64.powi(3),
        };
        let (cpu, memory) = resource_usage(&n, Some(&usage));
        assert!((cpu - 25.0).abs() < 1e-9);
        assert!((memory - 50.0).abs() < 1e-9);
    }

    #[test]
    fn resource_usage_without_metrics_is_zero() {
        let n = node(Some("True"), "2", "8Gi");
        assert_eq!(resource_usage(&n, None), (0.0, 0.0));
    }

    #[test]
    fn zero_allocatable_reports_zero_percent() {
        let n = node(Some("True"), "0", "8Gi");
        let usage = NodeUsage {
            cpu_millis: 500.0,
            memory_bytes: 2.0 * 1024f64.powi(3),
        };
        let (cpu, memory) = resource_usage(&n, Some(&usage));
        assert_eq!(cpu, 0.0);
        assert!((memory - 25.0).abs() < 1e-9);
    }
}
