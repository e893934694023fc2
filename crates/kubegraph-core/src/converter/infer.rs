//! # Edge Inference
//!
//! Derives the whole edge set from current node state.
//!
//! Passes run in a fixed order so the emitted edge order is stable:
//! 1. selector: Service -> Deployment / Pod / StatefulSet
//! 2. ingress-backend: Ingress -> Service
//! 3. config-ref / secret-ref: Deployment -> ConfigMap / Secret
//!
//! Ingress and config/secret references resolve by bare resource name, so a
//! reference can match same-named resources in other namespaces.

use crate::graph::Graph;
use crate::types::{Edge, Labels, Node, NodeId, RelationType, ResourceKind};
use serde_json::Value;
use std::collections::BTreeSet;

/// Whether a selector matches a label set.
///
/// Every selector pair must be present with an equal value. An empty
/// selector never matches.
#[must_use]
pub fn selector_matches(selector: &Labels, labels: &Labels) -> bool {
    !selector.is_empty()
        && selector
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
}

/// Compute the edge set for `graph` without touching it.
#[must_use]
pub fn compute_edges(graph: &Graph) -> Vec<Edge> {
    let mut emitter = EdgeEmitter::default();

    selector_pass(graph, &mut emitter);
    ingress_pass(graph, &mut emitter);
    reference_pass(graph, &mut emitter);

    tracing::debug!(edges = emitter.edges.len(), "inferred edges");
    emitter.edges
}

/// Recompute and install the edge set.
pub fn infer_edges(graph: &mut Graph) {
    let edges = compute_edges(graph);
    graph.replace_all_edges(edges);
}

// =============================================================================
// PASSES
// =============================================================================

fn selector_pass(graph: &Graph, emitter: &mut EdgeEmitter) {
    for service in graph.nodes().filter(|n| n.kind == ResourceKind::Service) {
        let Some(selector) = service.selector() else {
            continue;
        };
        for workload in graph
            .nodes()
            .filter(|n| n.kind.is_selectable_workload())
            .filter(|n| selector_matches(selector, &n.labels))
        {
            emitter.emit(&service.id, &workload.id, RelationType::Selector);
        }
    }
}

fn ingress_pass(graph: &Graph, emitter: &mut EdgeEmitter) {
    for ingress in graph.nodes().filter(|n| n.kind == ResourceKind::Ingress) {
        for backend in ingress_backends(&ingress.raw_spec) {
            for service in named(graph, &ResourceKind::Service, &backend) {
                emitter.emit(&ingress.id, &service.id, RelationType::IngressBackend);
            }
        }
    }
}

fn reference_pass(graph: &Graph, emitter: &mut EdgeEmitter) {
    for deployment in graph.nodes().filter(|n| n.kind == ResourceKind::Deployment) {
        let volumes = deployment
            .workload()
            .map(|w| w.volumes.as_slice())
            .unwrap_or_default();

        for container in deployment.containers() {
            for entry in &container.env {
                if let Some(name) = entry
                    .pointer("/valueFrom/configMapKeyRef/name")
                    .and_then(Value::as_str)
                {
                    emitter.emit_all(graph, deployment, &ResourceKind::ConfigMap, name);
                }
                if let Some(name) = entry
                    .pointer("/valueFrom/secretKeyRef/name")
                    .and_then(Value::as_str)
                {
                    emitter.emit_all(graph, deployment, &ResourceKind::Secret, name);
                }
            }

            for mount in container.mounted_volume_names() {
                let Some(volume) = volumes
                    .iter()
                    .find(|v| v.get("name").and_then(Value::as_str) == Some(mount))
                else {
                    continue;
                };
                if let Some(name) = volume.pointer("/configMap/name").and_then(Value::as_str) {
                    emitter.emit_all(graph, deployment, &ResourceKind::ConfigMap, name);
                }
                if let Some(name) = volume.pointer("/secret/secretName").and_then(Value::as_str) {
                    emitter.emit_all(graph, deployment, &ResourceKind::Secret, name);
                }
            }
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Collects edges in emission order, dropping repeats.
#[derive(Default)]
struct EdgeEmitter {
    edges: Vec<Edge>,
    seen: BTreeSet<Edge>,
}

impl EdgeEmitter {
    fn emit(&mut self, from: &NodeId, to: &NodeId, relation: RelationType) {
        let edge = Edge::new(from.clone(), to.clone(), relation);
        if self.seen.insert(edge.clone()) {
            self.edges.push(edge);
        }
    }

    /// Emit a config/secret reference from `from` to every node of `kind`
    /// called `name`.
    fn emit_all(&mut self, graph: &Graph, from: &Node, kind: &ResourceKind, name: &str) {
        let relation = if *kind == ResourceKind::Secret {
            RelationType::SecretRef
        } else {
            RelationType::ConfigRef
        };
        for target in named(graph, kind, name) {
            self.emit(&from.id, &target.id, relation);
        }
    }
}

fn named<'a>(
    graph: &'a Graph,
    kind: &'a ResourceKind,
    name: &'a str,
) -> impl Iterator<Item = &'a Node> {
    graph
        .nodes()
        .filter(move |n| &n.kind == kind && n.name == name)
}

/// Distinct backend service names of an Ingress, in first-seen order.
fn ingress_backends(spec: &Value) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let rules = spec.get("rules").and_then(Value::as_array);
    for rule in rules.into_iter().flatten() {
        let paths = rule.pointer("/http/paths").and_then(Value::as_array);
        for path in paths.into_iter().flatten() {
            if let Some(name) = path
                .pointer("/backend/service/name")
                .and_then(Value::as_str)
                && !names.iter().any(|n| n == name)
            {
                names.push(name.to_string());
            }
        }
    }
    names
}

// =============================================================================
// TESTS
// =============================================================================
