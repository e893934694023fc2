//! # Graph Store
//!
//! The node/edge/file store for one working set.
//!
//! The store knows nothing about YAML or validation rules. It keeps three
//! invariants:
//! - every node with a non-empty `source_file` is a member of that path's
//!   [`FileRecord`]
//! - a file is marked dirty whenever one of its member nodes is added,
//!   updated or removed, and by nothing else
//! - every stored edge joins two nodes present in the store
//!
//! Duplicate node ids are NOT rejected here: editing may pass through states
//! with two resources of the same identity, and reporting that is the
//! Validator's job. Lookups by id resolve to the first node in insertion order.

use crate::mutation::FieldUpdate;
use crate::types::{
    Edge, FileRecord, KindPayload, KubegraphError, Node, NodeId, RelationType, ResourceKind,
    Visual,
};
use std::collections::BTreeMap;

/// The Graph Store.
///
/// Nodes and edges keep insertion order; files are keyed by path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    files: BTreeMap<String, FileRecord>,
}

impl Graph {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // READ ACCESSORS
    // =========================================================================

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// All edges in emission order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// All file records, ordered by path.
    pub fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Get the first node with `id`.
    #[must_use]
    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    /// Nodes whose `source_file` is `path`, in insertion order.
    #[must_use]
    pub fn nodes_by_file(&self, path: &str) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.source_file == path).collect()
    }

    /// Paths of every dirty file, ordered by path.
    #[must_use]
    pub fn dirty_files(&self) -> Vec<&str> {
        self.files
            .values()
            .filter(|f| f.dirty)
            .map(|f| f.path.as_str())
            .collect()
    }

    /// Edges leaving `id`.
    pub fn outgoing(&self, id: &NodeId) -> impl Iterator<Item = &Edge> {
        let id = id.clone();
        self.edges.iter().filter(move |e| e.from == id)
    }

    /// Whether an edge `from -> to` of the given relation exists.
    #[must_use]
    pub fn contains_edge(&self, from: &NodeId, to: &NodeId, relation: RelationType) -> bool {
        self.edges
            .iter()
            .any(|e| &e.from == from && &e.to == to && e.relation == relation)
    }

    // =========================================================================
    // NODE MUTATION
    // =========================================================================

    /// Append a node.
    ///
    /// If the node has a source file, the file's record is created when
    /// missing, the id is added to its members, and the file is marked dirty.
    pub fn add_node(&mut self, node: Node) {
        self.touch_file(&node.source_file, &node.id);
        self.nodes.push(node);
    }

    /// Remove every node with `id`, every edge touching it, and its file
    /// membership. Removing an unknown id is a no-op.
    pub fn remove_node(&mut self, id: &NodeId) {
        if !self.contains_node(id) {
            return;
        }

        self.nodes.retain(|n| &n.id != id);
        self.edges.retain(|e| !e.touches(id));
        for record in self.files.values_mut() {
            if record.remove_object(id) {
                record.dirty = true;
            }
        }
    }

    /// Apply a batch of typed field updates to the first node with `id`.
    ///
    /// The whole batch is checked against the node's kind before any field is
    /// written; a rejected batch leaves the store untouched. On success the
    /// owning file is marked dirty (and the previous file too when the batch
    /// moved the node to another file).
    pub fn update_node(
        &mut self,
        id: &NodeId,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), KubegraphError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| KubegraphError::NodeNotFound(id.clone()))?;

        for update in &updates {
            update.check(&self.nodes[index])?;
        }

        let previous_file = self.nodes[index].source_file.clone();
        for update in updates {
            update.apply(&mut self.nodes[index]);
        }
        let current_file = self.nodes[index].source_file.clone();

        if previous_file != current_file {
            self.detach_from_file(&previous_file, id);
        }
        self.touch_file(&current_file, id);
        Ok(())
    }

    /// Change the identity of the first node with `id`.
    ///
    /// The id is a pure function of `(kind, namespace, name)`, so this removes
    /// the node under its old id and inserts it under the new one. Changing
    /// the kind resets the kind-specific payload and icon. Returns the new id.
    pub fn reidentify(
        &mut self,
        id: &NodeId,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<NodeId, KubegraphError> {
        let index = self
            .index_of(id)
            .ok_or_else(|| KubegraphError::NodeNotFound(id.clone()))?;

        let mut node = self.nodes.remove(index);
        if !self.contains_node(id) {
            self.edges.retain(|e| !e.touches(id));
        }
        self.detach_from_file(&node.source_file, id);

        if node.kind != kind {
            node.payload = KindPayload::for_kind(&kind);
            node.visual = Visual {
                icon: kind.icon().to_string(),
                ..node.visual
            };
        }
        node.id = NodeId::derive(&kind, namespace, name);
        node.kind = kind;
        node.namespace = namespace.to_string();
        node.name = name.to_string();

        let new_id = node.id.clone();
        self.add_node(node);
        Ok(new_id)
    }

    /// Overwrite the `occurrence`-th node (0-based) sharing `node.id`, or
    /// append the node when there are not that many.
    ///
    /// Overwriting with an identical node is not a mutation and leaves dirty
    /// flags alone.
    pub(crate) fn upsert_node(&mut self, node: Node, occurrence: usize) {
        let Some(index) = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.id == node.id)
            .map(|(i, _)| i)
            .nth(occurrence)
        else {
            self.add_node(node);
            return;
        };
        if self.nodes[index] == node {
            return;
        }

        let previous_file = std::mem::replace(&mut self.nodes[index], node).source_file;
        let id = self.nodes[index].id.clone();
        let current_file = self.nodes[index].source_file.clone();
        if previous_file != current_file {
            self.detach_from_file(&previous_file, &id);
        }
        self.touch_file(&current_file, &id);
    }

    /// Insert a node without marking its file dirty. Used when rebuilding a
    /// store from already-tracked state.
    pub(crate) fn restore_node(&mut self, node: Node) {
        if !node.source_file.is_empty() {
            self.files
                .entry(node.source_file.clone())
                .or_insert_with(|| FileRecord::new(node.source_file.clone()))
                .insert_object(&node.id);
        }
        self.nodes.push(node);
    }

    /// Drop every node loaded from `path` ahead of a reload. Same-id nodes
    /// in other files stay; edges left without an endpoint go. No file is
    /// marked dirty.
    pub(crate) fn evict_file_nodes(&mut self, path: &str) {
        self.nodes.retain(|n| n.source_file != path);
        let nodes = &self.nodes;
        self.edges.retain(|e| {
            nodes.iter().any(|n| n.id == e.from) && nodes.iter().any(|n| n.id == e.to)
        });
    }

    // =========================================================================
    // EDGES (inference pass only)
    // =========================================================================

    /// Store an edge if both endpoints exist. Returns true if stored.
    pub(crate) fn add_edge(&mut self, edge: Edge) -> bool {
        if !self.contains_node(&edge.from) || !self.contains_node(&edge.to) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Replace the whole edge set. Edges with a missing endpoint are dropped.
    pub(crate) fn replace_all_edges(&mut self, edges: Vec<Edge>) {
        self.edges.clear();
        for edge in edges {
            self.add_edge(edge);
        }
    }

    // =========================================================================
    // FILE RECORDS
    // =========================================================================

    /// Install a file record, replacing any record at the same path.
    pub(crate) fn install_file(&mut self, record: FileRecord) {
        self.files.insert(record.path.clone(), record);
    }

    pub(crate) fn file_mut(&mut self, path: &str) -> Option<&mut FileRecord> {
        self.files.get_mut(path)
    }

    /// Acknowledge that `path` was applied/saved externally.
    ///
    /// Clears the dirty flag and records the text and version token that were
    /// written. Returns false if the path is not tracked.
    pub fn mark_clean(&mut self, path: &str, content: String, sha: Option<String>) -> bool {
        let Some(record) = self.files.get_mut(path) else {
            return false;
        };
        record.dirty = false;
        record.content = content;
        if sha.is_some() {
            record.sha = sha;
        }
        true
    }

    // =========================================================================
    // INTERNAL HELPERS
    // =========================================================================

    fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.id == id)
    }

    /// Ensure `id` is a member of `path` and mark the file dirty.
    fn touch_file(&mut self, path: &str, id: &NodeId) {
        if path.is_empty() {
            return;
        }
        let record = self
            .files
            .entry(path.to_string())
            .or_insert_with(|| FileRecord::new(path));
        record.insert_object(id);
        record.dirty = true;
    }

    /// Drop `id` from `path` unless another node with that id still lives
    /// there. The file is marked dirty either way.
    fn detach_from_file(&mut self, path: &str, id: &NodeId) {
        if path.is_empty() {
            return;
        }
        let still_member = self
            .nodes
            .iter()
            .any(|n| &n.id == id && n.source_file == path);
        if let Some(record) = self.files.get_mut(path) {
            if !still_member {
                record.remove_object(id);
            }
            record.dirty = true;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Labels, WorkloadSpec};

    fn deployment(name: &str, file: &str) -> Node {
        Node::named(ResourceKind::Deployment, name).with_source_file(file)
    }

    fn clean(graph: &mut Graph, path: &str) {
        assert!(graph.mark_clean(path, String::new(), None));
    }

    #[test]
    fn add_node_creates_dirty_file_record() {
        let mut graph = Graph::new();
        graph.add_node(deployment("web", "apps.yaml"));

        let record = graph.file("apps.yaml").expect("record");
        assert!(record.dirty);
        assert_eq!(record.objects, vec![NodeId::from("deployment/default/web")]);
    }

    #[test]
    fn add_node_without_file_creates_no_record() {
        let mut graph = Graph::new();
        graph.add_node(Node::named(ResourceKind::Pod, "scratch"));
        assert_eq!(graph.files().count(), 0);
        assert!(graph.dirty_files().is_empty());
    }

    #[test]
    fn add_node_keeps_duplicate_ids() {
        let mut graph = Graph::new();
        graph.add_node(deployment("web", "a.yaml"));
        graph.add_node(deployment("web", "a.yaml"));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.file("a.yaml").expect("record").objects.len(), 1);
    }

    #[test]
    fn remove_node_drops_edges_and_membership() {
        let mut graph = Graph::new();
        let svc = Node::named(ResourceKind::Service, "web").with_source_file("svc.yaml");
        let dep = deployment("web", "dep.yaml");
        let (svc_id, dep_id) = (svc.id.clone(), dep.id.clone());
        graph.add_node(svc);
        graph.add_node(dep);
        graph.replace_all_edges(vec![Edge::new(
            svc_id.clone(),
            dep_id.clone(),
            RelationType::Selector,
        )]);
        clean(&mut graph, "svc.yaml");
        clean(&mut graph, "dep.yaml");

        graph.remove_node(&dep_id);

        assert!(graph.get_node(&dep_id).is_none());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.file("dep.yaml").expect("record").objects.is_empty());
        assert_eq!(graph.dirty_files(), vec!["dep.yaml"]);
    }

    #[test]
    fn remove_missing_node_is_noop() {
        let mut graph = Graph::new();
        graph.add_node(deployment("web", "a.yaml"));
        clean(&mut graph, "a.yaml");

        graph.remove_node(&NodeId::from("deployment/default/ghost"));

        assert_eq!(graph.node_count(), 1);
        assert!(graph.dirty_files().is_empty());
    }

    #[test]
    fn update_node_marks_file_dirty() {
        let mut graph = Graph::new();
        let node = deployment("web", "a.yaml");
        let id = node.id.clone();
        graph.add_node(node);
        clean(&mut graph, "a.yaml");

        graph
            .update_node(&id, vec![FieldUpdate::Replicas(3)])
            .expect("update");

        assert_eq!(
            graph.get_node(&id).and_then(Node::workload).map(|w| w.replicas),
            Some(3)
        );
        assert_eq!(graph.dirty_files(), vec!["a.yaml"]);
    }

    #[test]
    fn update_missing_node_reports_not_found() {
        let mut graph = Graph::new();
        let result = graph.update_node(&NodeId::from("service/default/x"), Vec::new());
        assert!(matches!(result, Err(KubegraphError::NodeNotFound(_))));
    }

    #[test]
    fn rejected_update_batch_changes_nothing() {
        let mut graph = Graph::new();
        let node = Node::named(ResourceKind::Service, "web").with_source_file("a.yaml");
        let id = node.id.clone();
        graph.add_node(node);
        clean(&mut graph, "a.yaml");
        let before = graph.clone();

        let result = graph.update_node(
            &id,
            vec![
                FieldUpdate::ServiceType("NodePort".to_string()),
                FieldUpdate::Replicas(2),
            ],
        );

        assert!(matches!(
            result,
            Err(KubegraphError::FieldNotApplicable { .. })
        ));
        assert_eq!(graph, before);
    }

    #[test]
    fn update_source_file_moves_membership() {
        let mut graph = Graph::new();
        let node = deployment("web", "old.yaml");
        let id = node.id.clone();
        graph.add_node(node);
        clean(&mut graph, "old.yaml");

        graph
            .update_node(&id, vec![FieldUpdate::SourceFile("new.yaml".to_string())])
            .expect("update");

        assert!(graph.file("old.yaml").expect("old").objects.is_empty());
        assert_eq!(graph.file("new.yaml").expect("new").objects, vec![id]);
        assert_eq!(graph.dirty_files(), vec!["new.yaml", "old.yaml"]);
        assert_eq!(graph.nodes_by_file("new.yaml").len(), 1);
    }

    #[test]
    fn reidentify_assigns_new_id_and_drops_old() {
        let mut graph = Graph::new();
        let node = deployment("web", "a.yaml").with_payload(KindPayload::Deployment(
            WorkloadSpec {
                replicas: 4,
                ..WorkloadSpec::default()
            },
        ));
        let old = node.id.clone();
        graph.add_node(node);

        let new = graph
            .reidentify(&old, ResourceKind::Deployment, "prod", "frontend")
            .expect("rename");

        assert_eq!(new.as_str(), "deployment/prod/frontend");
        assert!(graph.get_node(&old).is_none());
        let renamed = graph.get_node(&new).expect("renamed");
        assert_eq!(renamed.workload().map(|w| w.replicas), Some(4));
        assert_eq!(graph.file("a.yaml").expect("record").objects, vec![new]);
    }

    #[test]
    fn rekind_resets_payload() {
        let mut graph = Graph::new();
        let node = deployment("web", "a.yaml");
        let old = node.id.clone();
        graph.add_node(node);

        let new = graph
            .reidentify(&old, ResourceKind::StatefulSet, "default", "web")
            .expect("rekind");

        let node = graph.get_node(&new).expect("node");
        assert_eq!(node.payload, KindPayload::Other);
        assert_eq!(node.visual.icon, "statefulset");
    }

    #[test]
    fn add_edge_ignores_dangling_endpoints() {
        let mut graph = Graph::new();
        graph.add_node(Node::named(ResourceKind::Service, "web"));

        let stored = graph.add_edge(Edge::new(
            NodeId::from("service/default/web"),
            NodeId::from("deployment/default/missing"),
            RelationType::Selector,
        ));

        assert!(!stored);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn edge_replacement_does_not_dirty_files() {
        let mut graph = Graph::new();
        let svc = Node::named(ResourceKind::Service, "web").with_source_file("a.yaml");
        let dep = deployment("web", "a.yaml").with_labels([("app", "web")]);
        let edge = Edge::new(svc.id.clone(), dep.id.clone(), RelationType::Selector);
        graph.add_node(svc);
        graph.add_node(dep);
        clean(&mut graph, "a.yaml");

        graph.replace_all_edges(vec![edge.clone()]);

        assert!(graph.dirty_files().is_empty());
        assert!(graph.contains_edge(&edge.from, &edge.to, RelationType::Selector));
        assert_eq!(graph.outgoing(&edge.from).count(), 1);
    }

    #[test]
    fn upsert_identical_node_keeps_file_clean() {
        let mut graph = Graph::new();
        let node = deployment("web", "a.yaml");
        graph.add_node(node.clone());
        clean(&mut graph, "a.yaml");

        graph.upsert_node(node.clone(), 0);
        assert!(graph.dirty_files().is_empty());

        let mut changed = node;
        changed.labels = Labels::from([("tier".to_string(), "web".to_string())]);
        graph.upsert_node(changed, 0);
        assert_eq!(graph.dirty_files(), vec!["a.yaml"]);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn evict_file_nodes_spares_same_id_elsewhere() {
        let mut graph = Graph::new();
        let svc = Node::named(ResourceKind::Service, "web").with_source_file("a.yaml");
        let dep = deployment("web", "a.yaml");
        graph.add_node(svc.clone());
        graph.add_node(dep.clone());
        graph.add_node(deployment("web", "b.yaml"));
        graph.replace_all_edges(vec![Edge::new(
            svc.id.clone(),
            dep.id.clone(),
            RelationType::Selector,
        )]);

        graph.evict_file_nodes("a.yaml");

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.nodes_by_file("b.yaml").len(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn mark_clean_unknown_path_returns_false() {
        let mut graph = Graph::new();
        assert!(!graph.mark_clean("nope.yaml", String::new(), None));
    }
}
