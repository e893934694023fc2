//! # Resource Nodes
//!
//! One node per resource instance. Common metadata is held directly on
//! [`Node`]; fields that only some kinds carry live in the [`KindPayload`]
//! sum type so a Service can never hold a replica count.

use crate::primitives::{
    DEFAULT_ICON, DEFAULT_NAMESPACE, DEFAULT_PROTOCOL, DEFAULT_REPLICAS, DEFAULT_SERVICE_PORT,
    DEFAULT_SERVICE_TYPE, DEFAULT_VISUAL_SIZE,
};
use crate::types::{NodeId, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// String-to-string map used for labels, annotations, selectors and data.
pub type Labels = BTreeMap<String, String>;

// =============================================================================
// VISUAL METADATA
// =============================================================================

/// Cosmetic layout metadata. Carries no semantic invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visual {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub icon: String,
}

impl Default for Visual {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: DEFAULT_VISUAL_SIZE,
            height: DEFAULT_VISUAL_SIZE,
            icon: DEFAULT_ICON.to_string(),
        }
    }
}

impl Visual {
    /// Default layout with the icon for `kind`.
    #[must_use]
    pub fn for_kind(kind: &ResourceKind) -> Self {
        Self {
            icon: kind.icon().to_string(),
            ..Self::default()
        }
    }
}

// =============================================================================
// PORTS
// =============================================================================

/// A port given either as a number or as a named container port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Name(String),
}

impl PortValue {
    /// Read a port from a manifest value. Non-integer scalars are kept as names
    /// so that the Validator can report them.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(
                n.as_i64()
                    .map(Self::Number)
                    .unwrap_or_else(|| Self::Name(n.to_string())),
            ),
            Value::String(s) => Some(Self::Name(s.clone())),
            Value::Bool(b) => Some(Self::Name(b.to_string())),
            _ => None,
        }
    }

    /// The numeric port, if this is one.
    #[must_use]
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Name(_) => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => Value::from(*n),
            Self::Name(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Name(s) => f.write_str(s),
        }
    }
}

/// A normalized Service port entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub name: String,
    pub port: PortValue,
    pub target_port: PortValue,
    pub protocol: String,
}

impl ServicePort {
    /// Normalize a manifest port entry.
    ///
    /// `port` defaults to 80, `targetPort` to the port, `protocol` to TCP.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let port = value
            .get("port")
            .and_then(PortValue::from_json)
            .unwrap_or(PortValue::Number(DEFAULT_SERVICE_PORT));
        let target_port = value
            .get("targetPort")
            .and_then(PortValue::from_json)
            .unwrap_or_else(|| port.clone());

        Self {
            name: str_field(value, "name").unwrap_or_default(),
            port,
            target_port,
            protocol: str_field(value, "protocol").unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
        }
    }

    /// Render as a manifest port entry. An empty name is omitted.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if !self.name.is_empty() {
            map.insert("name".into(), Value::from(self.name.as_str()));
        }
        map.insert("port".into(), self.port.to_json());
        map.insert("targetPort".into(), self.target_port.to_json());
        map.insert("protocol".into(), Value::from(self.protocol.as_str()));
        Value::Object(map)
    }
}

// =============================================================================
// CONTAINERS
// =============================================================================

/// The container fields the engine tracks. Ports, env entries and volume
/// mounts stay in manifest form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub ports: Vec<Value>,
    pub env: Vec<Value>,
    pub volume_mounts: Vec<Value>,
}

impl Container {
    /// Extract a container from a manifest container entry.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        Self {
            name: str_field(value, "name").unwrap_or_default(),
            image: str_field(value, "image").unwrap_or_default(),
            ports: array_field(value, "ports"),
            env: array_field(value, "env"),
            volume_mounts: array_field(value, "volumeMounts"),
        }
    }

    /// Names of the volumes this container mounts.
    pub fn mounted_volume_names(&self) -> impl Iterator<Item = &str> {
        self.volume_mounts
            .iter()
            .filter_map(|mount| mount.get("name").and_then(Value::as_str))
    }
}

// =============================================================================
// KIND PAYLOADS
// =============================================================================

/// Typed Deployment fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub replicas: i64,
    /// `spec.selector.matchLabels`
    pub selector: Labels,
    pub containers: Vec<Container>,
    /// Pod template volumes, in manifest form.
    pub volumes: Vec<Value>,
}

impl Default for WorkloadSpec {
    fn default() -> Self {
        Self {
            replicas: DEFAULT_REPLICAS,
            selector: Labels::new(),
            containers: Vec::new(),
            volumes: Vec::new(),
        }
    }
}

/// Typed Service fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub service_type: String,
    pub selector: Labels,
    pub ports: Vec<ServicePort>,
}

impl Default for ServiceSpec {
    fn default() -> Self {
        Self {
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            selector: Labels::new(),
            ports: Vec::new(),
        }
    }
}

/// Kind-specific node payload.
///
/// Ingress rules and every field of the remaining kinds are kept in
/// [`Node::raw_spec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindPayload {
    Deployment(WorkloadSpec),
    Service(ServiceSpec),
    Ingress,
    ConfigMap { data: Labels },
    Secret { data: Labels },
    Other,
}

impl KindPayload {
    /// Empty payload for a kind.
    #[must_use]
    pub fn for_kind(kind: &ResourceKind) -> Self {
        match kind {
            ResourceKind::Deployment => Self::Deployment(WorkloadSpec::default()),
            ResourceKind::Service => Self::Service(ServiceSpec::default()),
            ResourceKind::Ingress => Self::Ingress,
            ResourceKind::ConfigMap => Self::ConfigMap { data: Labels::new() },
            ResourceKind::Secret => Self::Secret { data: Labels::new() },
            _ => Self::Other,
        }
    }
}

// =============================================================================
// NODE
// =============================================================================

/// One resource instance in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    /// Path of the originating file; empty for in-memory nodes.
    pub source_file: String,
    /// For Deployments: metadata labels merged with pod template labels.
    pub labels: Labels,
    pub annotations: Labels,
    /// The manifest `spec`, preserved verbatim. For ConfigMaps and Secrets,
    /// the top-level keys besides `data` (`type`, `stringData`, ...).
    pub raw_spec: Value,
    pub visual: Visual,
    pub payload: KindPayload,
}

impl Node {
    /// Create an empty node; the id is derived from the identity.
    #[must_use]
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let name = name.into();
        Self {
            id: NodeId::derive(&kind, &namespace, &name),
            visual: Visual::for_kind(&kind),
            payload: KindPayload::for_kind(&kind),
            kind,
            name,
            namespace,
            source_file: String::new(),
            labels: Labels::new(),
            annotations: Labels::new(),
            raw_spec: Value::Object(Map::new()),
        }
    }

    /// Create an empty node in the default namespace.
    #[must_use]
    pub fn named(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::new(kind, DEFAULT_NAMESPACE, name)
    }

    #[must_use]
    pub fn with_source_file(mut self, path: impl Into<String>) -> Self {
        self.source_file = path.into();
        self
    }

    #[must_use]
    pub fn with_labels<K, V>(mut self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.labels = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: KindPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Label selector of a Deployment or Service.
    #[must_use]
    pub fn selector(&self) -> Option<&Labels> {
        match &self.payload {
            KindPayload::Deployment(w) => Some(&w.selector),
            KindPayload::Service(s) => Some(&s.selector),
            _ => None,
        }
    }

    #[must_use]
    pub fn workload(&self) -> Option<&WorkloadSpec> {
        match &self.payload {
            KindPayload::Deployment(w) => Some(w),
            _ => None,
        }
    }

    #[must_use]
    pub fn service(&self) -> Option<&ServiceSpec> {
        match &self.payload {
            KindPayload::Service(s) => Some(s),
            _ => None,
        }
    }

    /// ConfigMap or Secret data.
    #[must_use]
    pub fn data(&self) -> Option<&Labels> {
        match &self.payload {
            KindPayload::ConfigMap { data } | KindPayload::Secret { data } => Some(data),
            _ => None,
        }
    }

    /// Deployment containers; empty for every other kind.
    #[must_use]
    pub fn containers(&self) -> &[Container] {
        self.workload().map_or(&[], |w| w.containers.as_slice())
    }

    /// Service ports; empty for every other kind.
    #[must_use]
    pub fn ports(&self) -> &[ServicePort] {
        self.service().map_or(&[], |s| s.ports.as_slice())
    }
}

// =============================================================================
// VALUE HELPERS
// =============================================================================

/// Read a string-to-string map, stringifying scalar values.
/// Nested values and nulls are dropped.
pub(crate) fn string_map(value: Option<&Value>) -> Labels {
    let Some(Value::Object(map)) = value else {
        return Labels::new();
    };
    map.iter()
        .filter_map(|(k, v)| scalar_string(v).map(|s| (k.clone(), s)))
        .collect()
}

pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn labels_to_json(labels: &Labels) -> Value {
    Value::Object(
        labels
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect(),
    )
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(scalar_string)
}

pub(crate) fn array_field(value: &Value, key: &str) -> Vec<Value> {
    match value.get(key) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}
