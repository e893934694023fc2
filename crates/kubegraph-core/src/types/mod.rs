//! # Core Type Definitions
//!
//! This module contains the entity types shared by every kubegraph component:
//! - Identifiers (`NodeId`) and the closed resource vocabulary (`ResourceKind`)
//! - Inferred relations (`Edge`, `RelationType`)
//! - Source file tracking (`FileRecord`)
//! - Error types (`KubegraphError`)
//!
//! The resource node itself and its kind-specific payloads live in [`node`].
//!
//! ## Determinism Guarantees
//!
//! - String-keyed maps are `BTreeMap` so serialized output has a stable order
//! - Node ids are a pure function of `(kind, namespace, name)`

pub mod node;

pub use node::{Container, KindPayload, Labels, Node, PortValue, ServicePort, ServiceSpec, Visual,
    WorkloadSpec};

use crate::primitives;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// NODE IDENTIFIER
// =============================================================================

/// Identifier of a resource node: `lowercase(kind)/namespace/name`.
///
/// Two nodes share an id exactly when they describe the same resource, so an
/// id collision inside one store is a duplicate-resource collision.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Derive the id for a resource identity.
    #[must_use]
    pub fn derive(kind: &ResourceKind, namespace: &str, name: &str) -> Self {
        Self(format!(
            "{}/{}/{}",
            kind.as_str().to_lowercase(),
            namespace,
            name
        ))
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// RESOURCE KIND
// =============================================================================

/// The resource kinds the engine understands.
///
/// Kinds outside the known set are carried as `Custom` so ingestion stays
/// best-effort; they get no kind-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Deployment,
    Service,
    Ingress,
    Pod,
    ConfigMap,
    Secret,
    PersistentVolumeClaim,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
    Custom(String),
}

impl ResourceKind {
    /// Canonical `kind` string as written in manifests.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Deployment => "Deployment",
            Self::Service => "Service",
            Self::Ingress => "Ingress",
            Self::Pod => "Pod",
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::Job => "Job",
            Self::CronJob => "CronJob",
            Self::Custom(name) => name,
        }
    }

    /// `apiVersion` emitted when regenerating a manifest of this kind.
    #[must_use]
    pub fn api_version(&self) -> &'static str {
        match self {
            Self::Deployment | Self::StatefulSet | Self::DaemonSet => primitives::API_APPS_V1,
            Self::Job | Self::CronJob => primitives::API_BATCH_V1,
            Self::Ingress => primitives::API_NETWORKING_V1,
            _ => primitives::API_CORE_V1,
        }
    }

    /// Presentation icon tag.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::Service => "service",
            Self::Ingress => "ingress",
            Self::Pod => "pod",
            Self::ConfigMap => "configmap",
            Self::Secret => "secret",
            Self::PersistentVolumeClaim => "pvc",
            Self::StatefulSet => "statefulset",
            Self::DaemonSet => "daemonset",
            Self::Job => "job",
            Self::CronJob => "cronjob",
            Self::Custom(_) => primitives::DEFAULT_ICON,
        }
    }

    /// Kinds a Service selector can target.
    #[must_use]
    pub fn is_selectable_workload(&self) -> bool {
        matches!(self, Self::Deployment | Self::Pod | Self::StatefulSet)
    }
}

impl From<&str> for ResourceKind {
    fn from(s: &str) -> Self {
        match s {
            "Deployment" => Self::Deployment,
            "Service" => Self::Service,
            "Ingress" => Self::Ingress,
            "Pod" => Self::Pod,
            "ConfigMap" => Self::ConfigMap,
            "Secret" => Self::Secret,
            "PersistentVolumeClaim" => Self::PersistentVolumeClaim,
            "StatefulSet" => Self::StatefulSet,
            "DaemonSet" => Self::DaemonSet,
            "Job" => Self::Job,
            "CronJob" => Self::CronJob,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for ResourceKind {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// EDGES
// =============================================================================

/// Typed relation carried by an inferred edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationType {
    /// Service selector matches workload labels.
    Selector,
    ServiceTarget,
    VolumeMount,
    /// Workload consumes a ConfigMap (env or volume).
    ConfigRef,
    /// Workload consumes a Secret (env or volume).
    SecretRef,
    /// Ingress rule routes to a Service backend.
    IngressBackend,
}

impl RelationType {
    /// Wire name of the relation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selector => "selector",
            Self::ServiceTarget => "service-target",
            Self::VolumeMount => "volume-mount",
            Self::ConfigRef => "config-ref",
            Self::SecretRef => "secret-ref",
            Self::IngressBackend => "ingress-backend",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed relation between two nodes.
///
/// Edges are derived data. Only the inference pass produces them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "relationType")]
    pub relation: RelationType,
}

impl Edge {
    #[must_use]
    pub fn new(from: NodeId, to: NodeId, relation: RelationType) -> Self {
        Self { from, to, relation }
    }

    /// Whether either endpoint is `id`.
    #[must_use]
    pub fn touches(&self, id: &NodeId) -> bool {
        &self.from == id || &self.to == id
    }
}

// =============================================================================
// FILE RECORD
// =============================================================================

/// One source manifest file and the nodes that belong to it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    /// Ordered set of member node ids.
    pub objects: Vec<NodeId>,
    pub dirty: bool,
    /// Opaque version token supplied by the source collaborator.
    pub sha: Option<String>,
    /// Last known text of the file.
    #[serde(default)]
    pub content: String,
}

impl FileRecord {
    /// Create an empty, clean record for `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Append `id` unless it is already a member. Returns true if appended.
    pub fn insert_object(&mut self, id: &NodeId) -> bool {
        if self.objects.contains(id) {
            return false;
        }
        self.objects.push(id.clone());
        true
    }

    /// Remove `id` from the members. Returns true if it was present.
    pub fn remove_object(&mut self, id: &NodeId) -> bool {
        let before = self.objects.len();
        self.objects.retain(|o| o != id);
        self.objects.len() != before
    }

    /// Union `other` into this record's members, keeping first-seen order.
    pub fn union_objects(&mut self, other: &[NodeId]) {
        for id in other {
            self.insert_object(id);
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in kubegraph.
///
/// Ingestion never produces an error; malformed documents are skipped and
/// counted instead. Validation problems are findings, not errors.
#[derive(Debug, Error)]
pub enum KubegraphError {
    /// The requested node was not found in the store.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A field update named a field outside the updatable set.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// A field update does not apply to the node's kind.
    #[error("Field '{field}' does not apply to kind {kind}")]
    FieldNotApplicable { field: String, kind: String },

    /// A field update carried a value of the wrong shape.
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
