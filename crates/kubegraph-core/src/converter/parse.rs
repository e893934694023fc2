//! # Forward Parse
//!
//! Manifest text -> nodes + file record.
//!
//! Ingestion is best-effort: a document that does not decode to a mapping, or
//! that lacks `kind` or `metadata.name`, is skipped without an error. Skips
//! are counted in a [`ParseReport`] so callers can observe them.

use crate::primitives::{DEFAULT_NAMESPACE, DEFAULT_REPLICAS, DEFAULT_SERVICE_TYPE};
use crate::types::node::{array_field, scalar_string, string_map};
use crate::types::{
    Container, FileRecord, KindPayload, Labels, Node, ResourceKind, ServicePort, ServiceSpec,
    WorkloadSpec,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Counts of what happened to each document in one manifest text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Documents seen in the text.
    pub documents: usize,
    /// Documents that became nodes.
    pub parsed: usize,
    /// Undecodable or non-mapping documents.
    pub skipped_malformed: usize,
    /// Mappings without `kind` or `metadata.name`.
    pub skipped_unidentified: usize,
}

impl ParseReport {
    /// Total skipped documents.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped_malformed + self.skipped_unidentified
    }

    /// Add another report's counts to this one.
    pub fn absorb(&mut self, other: &ParseReport) {
        self.documents += other.documents;
        self.parsed += other.parsed;
        self.skipped_malformed += other.skipped_malformed;
        self.skipped_unidentified += other.skipped_unidentified;
    }
}

/// Result of parsing one manifest file.
#[derive(Debug, Clone)]
pub struct ParsedManifest {
    /// Nodes in document order.
    pub nodes: Vec<Node>,
    /// A clean record for the file holding the raw text.
    pub file: FileRecord,
    pub report: ParseReport,
}

/// Parse a (possibly multi-document) manifest text.
pub fn parse(text: &str, file_path: &str) -> ParsedManifest {
    let mut report = ParseReport::default();
    let mut file = FileRecord::new(file_path);
    file.content = text.to_string();
    let mut nodes = Vec::new();

    for (index, document) in split_documents(text).iter().enumerate() {
        report.documents += 1;

        let decoded = match serde_yaml::from_str::<Value>(document) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                tracing::debug!(file = file_path, index, "skipping non-mapping document");
                report.skipped_malformed += 1;
                continue;
            }
            Err(e) => {
                tracing::debug!(file = file_path, index, error = %e, "skipping undecodable document");
                report.skipped_malformed += 1;
                continue;
            }
        };

        let Some(node) = node_from_document(&decoded, file_path) else {
            tracing::debug!(file = file_path, index, "skipping document without kind or metadata.name");
            report.skipped_unidentified += 1;
            continue;
        };

        file.insert_object(&node.id);
        nodes.push(node);
        report.parsed += 1;
    }

    tracing::debug!(
        file = file_path,
        parsed = report.parsed,
        skipped = report.skipped(),
        "parsed manifest"
    );

    ParsedManifest {
        nodes,
        file,
        report,
    }
}

/// Split a multi-document text on `---` marker lines.
///
/// Each chunk is decoded on its own, so a syntax error stays inside its
/// document. Chunks holding only blank lines or comments are dropped.
fn split_documents(text: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        match document_marker(line) {
            Some(rest) => {
                documents.push(std::mem::take(&mut current));
                // `--- {inline: doc}` keeps the text after the marker.
                let rest = rest.trim();
                if !rest.is_empty() {
                    current.push_str(rest);
                    current.push('\n');
                }
            }
            None => current.push_str(line),
        }
    }
    documents.push(current);

    documents.retain(|chunk| {
        chunk
            .lines()
            .map(str::trim)
            .any(|line| !line.is_empty() && !line.starts_with('#'))
    });
    documents
}

/// The remainder of `line` if it starts a new document.
fn document_marker(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("---")?;
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some(rest)
}

/// Build a node from one decoded manifest document.
fn node_from_document(doc: &Map<String, Value>, file_path: &str) -> Option<Node> {
    let kind = doc
        .get("kind")
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())?;
    let metadata = doc.get("metadata");
    let name = metadata
        .and_then(|m| m.get("name"))
        .and_then(scalar_string)
        .filter(|n| !n.is_empty())?;
    let namespace = metadata
        .and_then(|m| m.get("namespace"))
        .and_then(scalar_string)
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    let spec = match doc.get("spec") {
        Some(Value::Object(spec)) => Value::Object(spec.clone()),
        _ => Value::Object(Map::new()),
    };

    let mut node = Node::new(ResourceKind::from(kind), namespace, name).with_source_file(file_path);
    node.labels = string_map(metadata.and_then(|m| m.get("labels")));
    node.annotations = string_map(metadata.and_then(|m| m.get("annotations")));

    node.payload = match node.kind {
        ResourceKind::Deployment => {
            let (workload, template_labels) = extract_workload(&spec);
            node.labels.extend(template_labels);
            KindPayload::Deployment(workload)
        }
        ResourceKind::Service => KindPayload::Service(extract_service(&spec)),
        ResourceKind::Ingress => KindPayload::Ingress,
        ResourceKind::ConfigMap => KindPayload::ConfigMap {
            data: string_map(doc.get("data")),
        },
        ResourceKind::Secret => KindPayload::Secret {
            data: string_map(doc.get("data")),
        },
        _ => KindPayload::Other,
    };
    node.raw_spec = match node.payload {
        KindPayload::ConfigMap { .. } | KindPayload::Secret { .. } => top_level_extras(doc),
        _ => spec,
    };

    Some(node)
}

/// ConfigMaps and Secrets have no `spec`. Their other top-level keys
/// (`type`, `stringData`, `binaryData`, `immutable`) are kept in `raw_spec`.
fn top_level_extras(doc: &Map<String, Value>) -> Value {
    let mut extras = doc.clone();
    extras.retain(|key, _| !matches!(key.as_str(), "apiVersion" | "kind" | "metadata" | "data"));
    Value::Object(extras)
}

/// Deployment fields plus the pod template labels (which win over metadata
/// labels on key conflict).
fn extract_workload(spec: &Value) -> (WorkloadSpec, Labels) {
    let replicas = spec
        .get("replicas")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_REPLICAS);
    let selector = string_map(spec.pointer("/selector/matchLabels"));
    let template_labels = string_map(spec.pointer("/template/metadata/labels"));

    let pod_spec = spec.pointer("/template/spec").cloned().unwrap_or(Value::Null);
    let containers = array_field(&pod_spec, "containers")
        .iter()
        .filter(|c| c.is_object())
        .map(Container::from_json)
        .collect();
    let volumes = array_field(&pod_spec, "volumes");

    (
        WorkloadSpec {
            replicas,
            selector,
            containers,
            volumes,
        },
        template_labels,
    )
}

fn extract_service(spec: &Value) -> ServiceSpec {
    ServiceSpec {
        service_type: spec
            .get("type")
            .and_then(scalar_string)
            .unwrap_or_else(|| DEFAULT_SERVICE_TYPE.to_string()),
        selector: string_map(spec.get("selector")),
        ports: array_field(spec, "ports")
            .iter()
            .filter(|p| p.is_object())
            .map(ServicePort::from_json)
            .collect(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, PortValue};

    const DEPLOYMENT: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  labels:
    app: web
    tier: frontend
spec:
  replicas: 3
  selector:
    matchLabels:
      app: web
  template:
    metadata:
      labels:
        tier: backend
        version: "2"
    spec:
      containers:
        - name: web
          image: nginx:1.25
          ports:
            - containerPort: 80
          env:
            - name: DB_PASSWORD
              valueFrom:
                secretKeyRef:
                  name: db-creds
                  key: password
          volumeMounts:
            - name: config
              mountPath: /etc/web
      volumes:
        - name: config
          configMap:
            name: web-config
"#;

    #[test]
    fn parses_deployment_fields() {
        let parsed = parse(DEPLOYMENT, "apps/web.yaml");
        assert_eq!(parsed.nodes.len(), 1);

        let node = &parsed.nodes[0];
        assert_eq!(node.id, NodeId::from("deployment/default/web"));
        assert_eq!(node.namespace, "default");
        assert_eq!(node.source_file, "apps/web.yaml");
        assert_eq!(node.visual.icon, "deployment");

        let workload = node.workload().expect("deployment payload");
        assert_eq!(workload.replicas, 3);
        assert_eq!(workload.selector.get("app").map(String::as_str), Some("web"));
        assert_eq!(workload.containers.len(), 1);
        assert_eq!(workload.containers[0].image, "nginx:1.25");
        assert_eq!(workload.containers[0].env.len(), 1);
        assert_eq!(workload.volumes.len(), 1);
    }

    #[test]
    fn template_labels_win_on_conflict() {
        let parsed = parse(DEPLOYMENT, "web.yaml");
        let labels = &parsed.nodes[0].labels;
        assert_eq!(labels.get("app").map(String::as_str), Some("web"));
        assert_eq!(labels.get("tier").map(String::as_str), Some("backend"));
        assert_eq!(labels.get("version").map(String::as_str), Some("2"));
    }

    #[test]
    fn deployment_replicas_default_to_one() {
        let text = "kind: Deployment\nmetadata:\n  name: api\nspec: {}\n";
        let parsed = parse(text, "api.yaml");
        assert_eq!(parsed.nodes[0].workload().map(|w| w.replicas), Some(1));
    }

    #[test]
    fn parses_service_with_port_defaults() {
        let text = r#"
apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: shop
spec:
  selector:
    app: web
  ports:
    - name: http
      port: 8080
    - targetPort: metrics
"#;
        let parsed = parse(text, "svc.yaml");
        let node = &parsed.nodes[0];
        assert_eq!(node.id.as_str(), "service/shop/web");

        let service = node.service().expect("service payload");
        assert_eq!(service.service_type, "ClusterIP");
        assert_eq!(service.ports.len(), 2);
        assert_eq!(service.ports[0].target_port, PortValue::Number(8080));
        assert_eq!(service.ports[0].protocol, "TCP");
        assert_eq!(service.ports[1].port, PortValue::Number(80));
        assert_eq!(
            service.ports[1].target_port,
            PortValue::Name("metrics".to_string())
        );
    }

    #[test]
    fn config_and_secret_keep_data() {
        let text = r#"
kind: ConfigMap
metadata:
  name: web-config
data:
  LOG_LEVEL: debug
  WORKERS: 4
---
kind: Secret
metadata:
  name: db-creds
data:
  password: aHVudGVyMg==
"#;
        let parsed = parse(text, "config.yaml");
        assert_eq!(parsed.nodes.len(), 2);
        let data = parsed.nodes[0].data().expect("configmap data");
        assert_eq!(data.get("WORKERS").map(String::as_str), Some("4"));
        assert!(matches!(parsed.nodes[1].payload, KindPayload::Secret { .. }));
    }

    #[test]
    fn secret_keeps_type_and_string_data() {
        let text = r#"
apiVersion: v1
kind: Secret
metadata:
  name: web-tls
type: kubernetes.io/tls
stringData:
  note: rotated
data:
  tls.crt: Y2VydA==
"#;
        let parsed = parse(text, "tls.yaml");
        let node = &parsed.nodes[0];
        assert_eq!(
            node.raw_spec,
            serde_json::json!({"type": "kubernetes.io/tls", "stringData": {"note": "rotated"}})
        );
        assert_eq!(node.data().map(|d| d.len()), Some(1));
    }

    #[test]
    fn ingress_spec_is_preserved() {
        let text = r#"
kind: Ingress
metadata:
  name: edge
spec:
  rules:
    - host: shop.example.com
      http:
        paths:
          - path: /
            pathType: Prefix
            backend:
              service:
                name: web
                port:
                  number: 80
"#;
        let parsed = parse(text, "ingress.yaml");
        let node = &parsed.nodes[0];
        assert_eq!(node.payload, KindPayload::Ingress);
        assert_eq!(
            node.raw_spec.pointer("/rules/0/host").and_then(Value::as_str),
            Some("shop.example.com")
        );
    }

    #[test]
    fn other_kinds_keep_raw_spec_only() {
        let text = "kind: PersistentVolumeClaim\nmetadata:\n  name: data\nspec:\n  accessModes: [ReadWriteOnce]\n";
        let parsed = parse(text, "pvc.yaml");
        let node = &parsed.nodes[0];
        assert_eq!(node.payload, KindPayload::Other);
        assert_eq!(node.visual.icon, "pvc");
        assert!(node.raw_spec.get("accessModes").is_some());
    }

    #[test]
    fn unknown_kind_is_kept_as_custom() {
        let text = "kind: Widget\nmetadata:\n  name: w\n";
        let parsed = parse(text, "w.yaml");
        assert_eq!(parsed.nodes[0].kind, ResourceKind::Custom("Widget".to_string()));
        assert_eq!(parsed.nodes[0].visual.icon, "default");
    }

    #[test]
    fn non_mapping_documents_are_skipped_and_counted() {
        let text = "- just\n- a list\n---\nplain scalar\n---\nkind: Service\nmetadata:\n  name: web\n";
        let parsed = parse(text, "mixed.yaml");
        assert_eq!(parsed.nodes.len(), 1);
        assert_eq!(parsed.report.documents, 3);
        assert_eq!(parsed.report.parsed, 1);
        assert_eq!(parsed.report.skipped_malformed, 2);
    }

    #[test]
    fn documents_without_identity_are_skipped_and_counted() {
        let text = "kind: Service\nmetadata: {}\n---\nmetadata:\n  name: orphan\n---\nkind: Pod\nmetadata:\n  name: p\n";
        let parsed = parse(text, "ids.yaml");
        assert_eq!(parsed.nodes.len(), 1);
        assert_eq!(parsed.report.skipped_unidentified, 2);
        assert_eq!(parsed.report.skipped(), 2);
    }

    #[test]
    fn malformed_text_yields_no_nodes() {
        let parsed = parse("kind: [unclosed\n", "broken.yaml");
        assert!(parsed.nodes.is_empty());
        assert_eq!(parsed.report.documents, 1);
        assert_eq!(parsed.report.skipped_malformed, 1);
    }

    #[test]
    fn syntax_error_is_confined_to_its_document() {
        let text = "kind: Service\nmetadata:\n  name: a\n---\nkind: [unclosed\n---\nkind: Service\nmetadata:\n  name: b\n";
        let parsed = parse(text, "x.yaml");

        let names: Vec<&str> = parsed.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(parsed.report.documents, 3);
        assert_eq!(parsed.report.skipped_malformed, 1);
    }

    #[test]
    fn broken_final_document_keeps_earlier_ones() {
        let text = "kind: Service\nmetadata:\n  name: a\n---\nmetadata: {name: [\n";
        let parsed = parse(text, "tail.yaml");
        assert_eq!(parsed.nodes.len(), 1);
        assert_eq!(parsed.report.parsed, 1);
        assert_eq!(parsed.report.skipped_malformed, 1);
    }

    #[test]
    fn empty_documents_are_not_counted() {
        let text = "---\n# leading comment\n---\nkind: Pod\nmetadata:\n  name: p\n---\n";
        let parsed = parse(text, "pods.yaml");
        assert_eq!(parsed.report.documents, 1);
        assert_eq!(parsed.report.parsed, 1);
    }

    #[test]
    fn marker_needs_a_separator() {
        assert_eq!(document_marker("---\n"), Some("\n"));
        assert_eq!(document_marker("--- {a: 1}"), Some(" {a: 1}"));
        assert_eq!(document_marker("----\n"), None);
        assert_eq!(document_marker("  ---\n"), None);
    }

    #[test]
    fn file_record_is_clean_and_lists_objects() {
        let text = "kind: Service\nmetadata:\n  name: a\n---\nkind: Service\nmetadata:\n  name: b\n";
        let parsed = parse(text, "svc.yaml");
        assert!(!parsed.file.dirty);
        assert_eq!(parsed.file.content, text);
        assert_eq!(
            parsed.file.objects,
            vec![
                NodeId::from("service/default/a"),
                NodeId::from("service/default/b")
            ]
        );
    }

    #[test]
    fn parsing_is_deterministic() {
        let first = parse(DEPLOYMENT, "web.yaml");
        let second = parse(DEPLOYMENT, "web.yaml");
        assert_eq!(first.nodes, second.nodes);
        assert_eq!(first.file, second.file);
    }
}
