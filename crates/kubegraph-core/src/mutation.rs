//! # Field Updates
//!
//! The closed set of node fields an editor may change.
//!
//! Updates arrive either already typed ([`FieldUpdate`]) or as a JSON map of
//! field name to value (the shape an API layer receives). Names are matched
//! against a fixed table; anything outside it is rejected with
//! `UnknownField`. Identity fields (`kind`, `name`, `namespace`, `id`) are not
//! in the table because changing them changes the node id; use
//! [`Graph::reidentify`](crate::Graph::reidentify) instead.

use crate::types::node::string_map;
use crate::types::{Container, KindPayload, KubegraphError, Labels, Node, ServicePort, Visual};
use serde_json::{Map, Value};

/// One typed field assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    // Any kind
    Labels(Labels),
    Annotations(Labels),
    /// Replace the preserved manifest `spec`.
    Spec(Value),
    Visual(Visual),
    /// Reassign the node to another file.
    SourceFile(String),

    // Deployment
    Replicas(i64),
    Containers(Vec<Container>),
    Volumes(Vec<Value>),

    // Deployment, Service
    Selector(Labels),

    // Service
    ServiceType(String),
    Ports(Vec<ServicePort>),

    // ConfigMap, Secret
    Data(Labels),
}

impl FieldUpdate {
    /// Wire names of every updatable field.
    pub const FIELDS: &'static [&'static str] = &[
        "labels",
        "annotations",
        "spec",
        "visual",
        "filePath",
        "replicas",
        "containers",
        "volumes",
        "selector",
        "serviceType",
        "ports",
        "data",
    ];

    /// Wire name of the field this update writes.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Labels(_) => "labels",
            Self::Annotations(_) => "annotations",
            Self::Spec(_) => "spec",
            Self::Visual(_) => "visual",
            Self::SourceFile(_) => "filePath",
            Self::Replicas(_) => "replicas",
            Self::Containers(_) => "containers",
            Self::Volumes(_) => "volumes",
            Self::Selector(_) => "selector",
            Self::ServiceType(_) => "serviceType",
            Self::Ports(_) => "ports",
            Self::Data(_) => "data",
        }
    }

    /// Build a typed update from a field name and a JSON value.
    pub fn from_json(field: &str, value: &Value) -> Result<Self, KubegraphError> {
        let update = match field {
            "labels" => Self::Labels(expect_map(field, value)?),
            "annotations" => Self::Annotations(expect_map(field, value)?),
            "spec" => {
                if !value.is_object() {
                    return Err(invalid(field, "expected a mapping"));
                }
                Self::Spec(value.clone())
            }
            "visual" => Self::Visual(
                serde_json::from_value(value.clone()).map_err(|e| invalid(field, e))?,
            ),
            "filePath" => Self::SourceFile(expect_str(field, value)?),
            "replicas" => {
                let replicas = value
                    .as_i64()
                    .filter(|r| *r >= 0)
                    .ok_or_else(|| invalid(field, "expected a non-negative integer"))?;
                Self::Replicas(replicas)
            }
            "containers" => Self::Containers(
                expect_objects(field, value)?
                    .iter()
                    .map(Container::from_json)
                    .collect(),
            ),
            "volumes" => Self::Volumes(expect_objects(field, value)?.to_vec()),
            "selector" => Self::Selector(expect_map(field, value)?),
            "serviceType" => Self::ServiceType(expect_str(field, value)?),
            "ports" => Self::Ports(
                expect_objects(field, value)?
                    .iter()
                    .map(ServicePort::from_json)
                    .collect(),
            ),
            "data" => Self::Data(expect_map(field, value)?),
            other => return Err(KubegraphError::UnknownField(other.to_string())),
        };
        Ok(update)
    }

    /// Parse a whole `{field: value}` map. Fails on the first bad entry.
    pub fn from_json_map(map: &Map<String, Value>) -> Result<Vec<Self>, KubegraphError> {
        map.iter()
            .map(|(field, value)| Self::from_json(field, value))
            .collect()
    }

    /// Check that this update applies to `node`'s kind.
    pub fn check(&self, node: &Node) -> Result<(), KubegraphError> {
        let applies = match self {
            Self::Labels(_)
            | Self::Annotations(_)
            | Self::Spec(_)
            | Self::Visual(_)
            | Self::SourceFile(_) => true,
            Self::Replicas(_) | Self::Containers(_) | Self::Volumes(_) => {
                matches!(node.payload, KindPayload::Deployment(_))
            }
            Self::Selector(_) => matches!(
                node.payload,
                KindPayload::Deployment(_) | KindPayload::Service(_)
            ),
            Self::ServiceType(_) | Self::Ports(_) => {
                matches!(node.payload, KindPayload::Service(_))
            }
            Self::Data(_) => matches!(
                node.payload,
                KindPayload::ConfigMap { .. } | KindPayload::Secret { .. }
            ),
        };

        if applies {
            Ok(())
        } else {
            Err(KubegraphError::FieldNotApplicable {
                field: self.field_name().to_string(),
                kind: node.kind.to_string(),
            })
        }
    }

    /// Write the field. Callers run [`check`](Self::check) first; an update
    /// for a field the payload does not carry is dropped.
    pub(crate) fn apply(self, node: &mut Node) {
        match (self, &mut node.payload) {
            (Self::Labels(labels), _) => node.labels = labels,
            (Self::Annotations(annotations), _) => node.annotations = annotations,
            (Self::Spec(spec), _) => node.raw_spec = spec,
            (Self::Visual(visual), _) => node.visual = visual,
            (Self::SourceFile(path), _) => node.source_file = path,
            (Self::Replicas(replicas), KindPayload::Deployment(w)) => w.replicas = replicas,
            (Self::Containers(containers), KindPayload::Deployment(w)) => {
                w.containers = containers;
            }
            (Self::Volumes(volumes), KindPayload::Deployment(w)) => w.volumes = volumes,
            (Self::Selector(selector), KindPayload::Deployment(w)) => w.selector = selector,
            (Self::Selector(selector), KindPayload::Service(s)) => s.selector = selector,
            (Self::ServiceType(service_type), KindPayload::Service(s)) => {
                s.service_type = service_type;
            }
            (Self::Ports(ports), KindPayload::Service(s)) => s.ports = ports,
            (
                Self::Data(new_data),
                KindPayload::ConfigMap { data } | KindPayload::Secret { data },
            ) => *data = new_data,
            _ => {}
        }
    }
}

fn invalid(field: &str, reason: impl ToString) -> KubegraphError {
    KubegraphError::InvalidFieldValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn expect_map(field: &str, value: &Value) -> Result<Labels, KubegraphError> {
    if !value.is_object() {
        return Err(invalid(field, "expected a mapping"));
    }
    Ok(string_map(Some(value)))
}

fn expect_str(field: &str, value: &Value) -> Result<String, KubegraphError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(field, "expected a string"))
}

fn expect_objects<'a>(field: &str, value: &'a Value) -> Result<&'a [Value], KubegraphError> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(field, "expected a list"))?;
    if items.iter().any(|item| !item.is_object()) {
        return Err(invalid(field, "expected a list of mappings"));
    }
    Ok(items)
}

// =============================================================================
// TESTS
// =============================================================================
