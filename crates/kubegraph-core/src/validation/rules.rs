//! Individual validation rules. Each appends to the shared finding list.

use super::{Finding, Severity};
use crate::converter::{render_manifest, selector_matches};
use crate::graph::Graph;
use crate::primitives::{MAX_PORT, MIN_PORT};
use crate::types::{Node, PortValue, ResourceKind, WorkloadSpec};
use serde_json::Value;
use std::collections::BTreeSet;

const IMAGE_FIELD: &str = "spec.template.spec.containers.image";
const TEMPLATE_PATH: &str = "spec.template";

fn finding(node: &Node, field: &str, message: String, severity: Severity) -> Finding {
    Finding {
        node_id: node.id.clone(),
        field: field.to_string(),
        message,
        severity,
        file_path: node.source_file.clone(),
    }
}

// =============================================================================
// DUPLICATES
// =============================================================================

/// Every node after the first with the same `(kind, namespace, name)`.
pub(super) fn duplicate_names(graph: &Graph, out: &mut Vec<Finding>) {
    let mut seen: BTreeSet<(&ResourceKind, &str, &str)> = BTreeSet::new();
    for node in graph.nodes() {
        if !seen.insert((&node.kind, node.namespace.as_str(), node.name.as_str())) {
            out.push(finding(
                node,
                "metadata.name",
                format!("Duplicate {} name: {}", node.kind, node.name),
                Severity::Error,
            ));
        }
    }
}

// =============================================================================
// REQUIRED FIELDS
// =============================================================================

fn required_paths(kind: &ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Deployment => &["metadata.name", "spec.selector.matchLabels", TEMPLATE_PATH],
        ResourceKind::Service => &["metadata.name", "spec.selector", "spec.ports"],
        ResourceKind::Ingress => &["metadata.name", "spec.rules"],
        ResourceKind::ConfigMap | ResourceKind::Secret => &["metadata.name"],
        ResourceKind::Pod => &["metadata.name", "spec.containers"],
        _ => &[],
    }
}

/// Required paths are resolved against the node's regenerated manifest, so
/// typed fields and preserved spec keys are checked the same way. The pod
/// template is the exception: see [`has_pod_template`].
pub(super) fn required_fields(graph: &Graph, out: &mut Vec<Finding>) {
    for node in graph.nodes() {
        let paths = required_paths(&node.kind);
        if paths.is_empty() {
            continue;
        }
        let manifest = render_manifest(node);
        for path in paths {
            let present = match (*path, node.workload()) {
                (TEMPLATE_PATH, Some(workload)) => has_pod_template(node, workload),
                _ => is_present(resolve(&manifest, path)),
            };
            if !present {
                out.push(finding(
                    node,
                    path,
                    format!("Missing required field: {}", path),
                    Severity::Error,
                ));
            }
        }
    }
}

/// Regeneration always emits a template skeleton, so a Deployment has a pod
/// template only if its source carried one or it holds containers or volumes.
fn has_pod_template(node: &Node, workload: &WorkloadSpec) -> bool {
    is_present(node.raw_spec.get("template"))
        || !workload.containers.is_empty()
        || !workload.volumes.is_empty()
}

fn resolve<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

/// Present means non-null and non-empty. `false` and zero count as present.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Bool(_) | Value::Number(_)) => true,
    }
}

// =============================================================================
// SELECTORS
// =============================================================================

/// A Deployment's selector must be a subset of its (merged) labels.
pub(super) fn selector_consistency(graph: &Graph, out: &mut Vec<Finding>) {
    for node in graph.nodes().filter(|n| n.kind == ResourceKind::Deployment) {
        let Some(selector) = node.selector() else {
            continue;
        };
        if selector.is_empty() || node.labels.is_empty() {
            continue;
        }
        for (key, value) in selector {
            if node.labels.get(key) != Some(value) {
                out.push(finding(
                    node,
                    "spec.selector.matchLabels",
                    format!("Selector '{}={}' does not match template labels", key, value),
                    Severity::Error,
                ));
            }
        }
    }
}

/// A Service selector should reach at least one workload.
pub(super) fn service_reachability(graph: &Graph, out: &mut Vec<Finding>) {
    for service in graph.nodes().filter(|n| n.kind == ResourceKind::Service) {
        let Some(selector) = service.selector().filter(|s| !s.is_empty()) else {
            continue;
        };
        let reaches = graph
            .nodes()
            .filter(|n| n.kind.is_selectable_workload())
            .any(|n| selector_matches(selector, &n.labels));
        if !reaches {
            out.push(finding(
                service,
                "spec.selector",
                "Service selector does not match any workload".to_string(),
                Severity::Warning,
            ));
        }
    }
}

// =============================================================================
// PORTS
// =============================================================================

fn in_range(port: i64) -> bool {
    (MIN_PORT..=MAX_PORT).contains(&port)
}

/// `port` must be a number in range. A numeric `targetPort` that differs
/// from `port` is checked separately under `spec.ports.targetPort`.
///
/// A `targetPort` equal to `port` is never reported on its own, whether it
/// was written out or defaulted: an out-of-range pair yields the single
/// `spec.ports` error, so `{port: 70000, targetPort: 70000}` reports once.
pub(super) fn port_ranges(graph: &Graph, out: &mut Vec<Finding>) {
    for node in graph.nodes() {
        for port in node.ports() {
            if !port.port.as_number().is_some_and(in_range) {
                out.push(finding(
                    node,
                    "spec.ports",
                    format!("Invalid port number: {}", port.port),
                    Severity::Error,
                ));
            }

            if let PortValue::Number(target) = port.target_port
                && port.target_port != port.port
                && !in_range(target)
            {
                out.push(finding(
                    node,
                    "spec.ports.targetPort",
                    format!("Invalid targetPort: {}", target),
                    Severity::Error,
                ));
            }
        }
    }
}

// =============================================================================
// IMAGES
// =============================================================================

pub(super) fn container_images(graph: &Graph, out: &mut Vec<Finding>) {
    for node in graph.nodes().filter(|n| n.kind == ResourceKind::Deployment) {
        for container in node.containers() {
            if container.image.is_empty() {
                out.push(finding(
                    node,
                    IMAGE_FIELD,
                    "Container image is required".to_string(),
                    Severity::Error,
                ));
            } else if container.image.chars().any(char::is_whitespace) {
                out.push(finding(
                    node,
                    IMAGE_FIELD,
                    format!("Invalid image name format: {}", container.image),
                    Severity::Warning,
                ));
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
