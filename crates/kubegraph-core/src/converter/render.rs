//! # Reverse Regenerate
//!
//! Nodes -> manifest documents.
//!
//! Typed fields are written over the preserved `raw_spec`, so keys the engine
//! does not model (probes, resources, strategy, ...) survive a round trip.
//! Nothing is invented: a field the node does not carry is not emitted.

use crate::graph::Graph;
use crate::types::node::labels_to_json;
use crate::types::{Container, KindPayload, KubegraphError, Node, ServiceSpec, WorkloadSpec};
use serde_json::{Map, Value};

/// Build the manifest document for one node.
#[must_use]
pub fn render_manifest(node: &Node) -> Value {
    let mut doc = Map::new();
    doc.insert("apiVersion".into(), Value::from(node.kind.api_version()));
    doc.insert("kind".into(), Value::from(node.kind.as_str()));
    doc.insert("metadata".into(), render_metadata(node));

    let raw = match &node.raw_spec {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    match &node.payload {
        KindPayload::Deployment(workload) => {
            doc.insert("spec".into(), Value::Object(render_workload(node, workload, raw)));
        }
        KindPayload::Service(service) => {
            doc.insert("spec".into(), Value::Object(render_service(service, raw)));
        }
        KindPayload::Ingress => {
            let mut spec = raw;
            spec.entry("rules").or_insert_with(|| Value::Array(Vec::new()));
            doc.insert("spec".into(), Value::Object(spec));
        }
        KindPayload::ConfigMap { data } | KindPayload::Secret { data } => {
            for (key, value) in raw {
                doc.entry(key).or_insert(value);
            }
            if !data.is_empty() {
                doc.insert("data".into(), labels_to_json(data));
            }
        }
        KindPayload::Other => {
            if !raw.is_empty() {
                doc.insert("spec".into(), Value::Object(raw));
            }
        }
    }

    Value::Object(doc)
}

/// Regenerate the manifest text of `path`: one document per node whose
/// source file is `path`, in store order. Empty when no node belongs there.
pub fn to_manifest_text(graph: &Graph, path: &str) -> Result<String, KubegraphError> {
    let documents = graph
        .nodes_by_file(path)
        .into_iter()
        .map(|node| {
            serde_yaml::to_string(&render_manifest(node))
                .map_err(|e| KubegraphError::SerializationError(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(file = path, documents = documents.len(), "regenerated manifest");
    Ok(documents.join("---\n"))
}

// =============================================================================
// PER-KIND BUILDERS
// =============================================================================

fn render_metadata(node: &Node) -> Value {
    let mut metadata = Map::new();
    metadata.insert("name".into(), Value::from(node.name.as_str()));
    metadata.insert("namespace".into(), Value::from(node.namespace.as_str()));
    if !node.labels.is_empty() {
        metadata.insert("labels".into(), labels_to_json(&node.labels));
    }
    if !node.annotations.is_empty() {
        metadata.insert("annotations".into(), labels_to_json(&node.annotations));
    }
    Value::Object(metadata)
}

fn render_workload(node: &Node, workload: &WorkloadSpec, mut spec: Map<String, Value>) -> Map<String, Value> {
    spec.insert("replicas".into(), Value::from(workload.replicas));

    let mut selector = object_at(&spec, "selector");
    selector.insert("matchLabels".into(), labels_to_json(&workload.selector));
    spec.insert("selector".into(), Value::Object(selector));

    let mut template = object_at(&spec, "template");

    let mut template_metadata = object_at(&template, "metadata");
    set_or_remove(
        &mut template_metadata,
        "labels",
        (!node.labels.is_empty()).then(|| labels_to_json(&node.labels)),
    );
    set_or_remove(
        &mut template,
        "metadata",
        (!template_metadata.is_empty()).then_some(Value::Object(template_metadata)),
    );

    let mut pod_spec = object_at(&template, "spec");
    let raw_containers = match pod_spec.get("containers") {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let containers = workload
        .containers
        .iter()
        .map(|c| render_container(c, &raw_containers))
        .collect();
    pod_spec.insert("containers".into(), Value::Array(containers));
    set_or_remove(
        &mut pod_spec,
        "volumes",
        (!workload.volumes.is_empty()).then(|| Value::Array(workload.volumes.clone())),
    );
    template.insert("spec".into(), Value::Object(pod_spec));

    spec.insert("template".into(), Value::Object(template));
    spec
}

/// Write a container's tracked fields over the raw entry with the same name.
fn render_container(container: &Container, raw_containers: &[Value]) -> Value {
    let mut entry = raw_containers
        .iter()
        .filter_map(Value::as_object)
        .find(|raw| {
            !container.name.is_empty()
                && raw.get("name").and_then(Value::as_str) == Some(container.name.as_str())
        })
        .cloned()
        .unwrap_or_default();

    let text = |s: &str| (!s.is_empty()).then(|| Value::from(s));
    let list = |items: &[Value]| (!items.is_empty()).then(|| Value::Array(items.to_vec()));

    set_or_remove(&mut entry, "name", text(&container.name));
    set_or_remove(&mut entry, "image", text(&container.image));
    set_or_remove(&mut entry, "ports", list(&container.ports));
    set_or_remove(&mut entry, "env", list(&container.env));
    set_or_remove(&mut entry, "volumeMounts", list(&container.volume_mounts));
    Value::Object(entry)
}

fn render_service(service: &ServiceSpec, mut spec: Map<String, Value>) -> Map<String, Value> {
    spec.insert("type".into(), Value::from(service.service_type.as_str()));
    spec.insert("selector".into(), labels_to_json(&service.selector));
    spec.insert(
        "ports".into(),
        Value::Array(service.ports.iter().map(|p| p.to_json()).collect()),
    );
    spec
}

// =============================================================================
// MAP HELPERS
// =============================================================================

/// Clone the mapping under `key`, or an empty one.
fn object_at(map: &Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.get(key) {
        Some(Value::Object(inner)) => inner.clone(),
        _ => Map::new(),
    }
}

/// Insert `value`, or drop the key when there is none. Key order is kept.
fn set_or_remove(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    match value {
        Some(value) => {
            map.insert(key.to_string(), value);
        }
        None => map.retain(|k, _| k != key),
    }
}

// =============================================================================
// TESTS
// =============================================================================
