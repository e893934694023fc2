//! # Graph Snapshot
//!
//! The JSON form of a Graph Store consumed by presentation layers:
//!
//! ```text
//! { "nodes": [ WireNode ], "edges": [ Edge ], "files": { path: FileRecord } }
//! ```
//!
//! Every node carries every field, whatever its kind, so consumers can read
//! the snapshot without knowing the kind table. Fields that do not apply to a
//! node's kind hold their defaults on export and are ignored on import.
//!
//! Import is tolerant the same way ingestion is: node ids are re-derived from
//! `(kind, namespace, name)` and edges with a missing endpoint are dropped.

use crate::graph::Graph;
use crate::primitives::{DEFAULT_NAMESPACE, DEFAULT_REPLICAS, DEFAULT_SERVICE_TYPE};
use crate::types::{
    Container, Edge, FileRecord, KindPayload, KubegraphError, Labels, Node, ResourceKind,
    ServicePort, ServiceSpec, Visual, WorkloadSpec,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Serializable form of a whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<WireNode>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
}

/// Flat serializable form of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNode {
    /// Informational on import; the id is always re-derived.
    #[serde(default)]
    pub id: String,
    pub kind: ResourceKind,
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default = "empty_object")]
    pub spec: Value,
    #[serde(default)]
    pub visual: Visual,
    #[serde(default)]
    pub annotations: Labels,
    #[serde(default = "default_replicas")]
    pub replicas: i64,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default, deserialize_with = "normalized_ports")]
    pub ports: Vec<ServicePort>,
    /// Env entries of every container, flattened. Export only.
    #[serde(default)]
    pub env: Vec<Value>,
    #[serde(default)]
    pub volumes: Vec<Value>,
    /// Volume mounts of every container, flattened. Export only.
    #[serde(default)]
    pub volume_mounts: Vec<Value>,
    #[serde(default)]
    pub selector: Labels,
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default)]
    pub data: Labels,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_replicas() -> i64 {
    DEFAULT_REPLICAS
}

fn default_service_type() -> String {
    DEFAULT_SERVICE_TYPE.to_string()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Port entries go through the same defaults as manifest ports.
fn normalized_ports<'de, D>(deserializer: D) -> Result<Vec<ServicePort>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .filter(|p| p.is_object())
        .map(ServicePort::from_json)
        .collect())
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<&Node> for WireNode {
    fn from(node: &Node) -> Self {
        let containers = node.containers();
        let workload = node.workload();
        let service = node.service();

        Self {
            id: node.id.to_string(),
            kind: node.kind.clone(),
            name: node.name.clone(),
            namespace: node.namespace.clone(),
            file_path: node.source_file.clone(),
            labels: node.labels.clone(),
            spec: node.raw_spec.clone(),
            visual: node.visual.clone(),
            annotations: node.annotations.clone(),
            replicas: workload.map_or(DEFAULT_REPLICAS, |w| w.replicas),
            containers: containers.to_vec(),
            ports: node.ports().to_vec(),
            env: containers.iter().flat_map(|c| c.env.iter().cloned()).collect(),
            volumes: workload.map(|w| w.volumes.clone()).unwrap_or_default(),
            volume_mounts: containers
                .iter()
                .flat_map(|c| c.volume_mounts.iter().cloned())
                .collect(),
            selector: node.selector().cloned().unwrap_or_default(),
            service_type: service
                .map_or(DEFAULT_SERVICE_TYPE, |s| s.service_type.as_str())
                .to_string(),
            data: node.data().cloned().unwrap_or_default(),
        }
    }
}

impl From<WireNode> for Node {
    fn from(wire: WireNode) -> Self {
        let payload = match wire.kind {
            ResourceKind::Deployment => KindPayload::Deployment(WorkloadSpec {
                replicas: wire.replicas,
                selector: wire.selector,
                containers: wire.containers,
                volumes: wire.volumes,
            }),
            ResourceKind::Service => KindPayload::Service(ServiceSpec {
                service_type: wire.service_type,
                selector: wire.selector,
                ports: wire.ports,
            }),
            ResourceKind::ConfigMap => KindPayload::ConfigMap { data: wire.data },
            ResourceKind::Secret => KindPayload::Secret { data: wire.data },
            ref kind => KindPayload::for_kind(kind),
        };

        let mut node = Node::new(wire.kind, wire.namespace, wire.name)
            .with_source_file(wire.file_path)
            .with_payload(payload);
        if !wire.id.is_empty() && wire.id != node.id.as_str() {
            tracing::debug!(wire = %wire.id, derived = %node.id, "re-derived node id");
        }
        node.labels = wire.labels;
        node.annotations = wire.annotations;
        node.raw_spec = if wire.spec.is_object() {
            wire.spec
        } else {
            empty_object()
        };
        node.visual = wire.visual;
        node
    }
}

impl From<&Graph> for GraphSnapshot {
    fn from(graph: &Graph) -> Self {
        Self {
            nodes: graph.nodes().map(WireNode::from).collect(),
            edges: graph.edges().to_vec(),
            files: graph
                .files()
                .map(|f| (f.path.clone(), f.clone()))
                .collect(),
        }
    }
}

impl From<GraphSnapshot> for Graph {
    fn from(snapshot: GraphSnapshot) -> Self {
        let mut graph = Graph::new();

        for (path, mut record) in snapshot.files {
            record.path = path;
            graph.install_file(record);
        }
        for wire in snapshot.nodes {
            graph.restore_node(Node::from(wire));
        }

        let offered = snapshot.edges.len();
        graph.replace_all_edges(snapshot.edges);
        if graph.edge_count() != offered {
            tracing::debug!(
                dropped = offered - graph.edge_count(),
                "dropped edges with a missing endpoint"
            );
        }
        graph
    }
}

impl Graph {
    /// Snapshot this store in its wire form.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::from(self)
    }

    /// Rebuild a store from its wire form. No file is marked dirty beyond
    /// what the snapshot records.
    #[must_use]
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        Self::from(snapshot)
    }
}

// =============================================================================
// JSON TEXT
// =============================================================================

/// Serialize a store to pretty-printed snapshot JSON.
pub fn graph_to_json(graph: &Graph) -> Result<String, KubegraphError> {
    serde_json::to_string_pretty(&graph.snapshot())
        .map_err(|e| KubegraphError::SerializationError(e.to_string()))
}

/// Rebuild a store from snapshot JSON.
pub fn graph_from_json(text: &str) -> Result<Graph, KubegraphError> {
    let snapshot: GraphSnapshot = serde_json::from_str(text)
        .map_err(|e| KubegraphError::DeserializationError(e.to_string()))?;
    Ok(Graph::from_snapshot(snapshot))
}

// =============================================================================
// TESTS
// =============================================================================
