//! # Property-Based Tests
//!
//! Determinism and idempotence invariants of the engine, checked with
//! proptest over generated resource sets.

use kubegraph_core::{
    Converter, Graph, KindPayload, Labels, Node, NodeId, ResourceKind, ServiceSpec, Validator,
};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;

// =============================================================================
// STRATEGIES
// =============================================================================

fn kind() -> impl Strategy<Value = ResourceKind> {
    prop_oneof![
        Just(ResourceKind::Deployment),
        Just(ResourceKind::Service),
        Just(ResourceKind::Pod),
        Just(ResourceKind::ConfigMap),
        Just(ResourceKind::StatefulSet),
    ]
}

fn dns_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,8}"
}

fn label_set() -> impl Strategy<Value = Labels> {
    btree_map("(app|tier|zone)", "(web|api|db)", 0..3)
}

/// A node with random identity, labels and (for Services) selector.
fn node() -> impl Strategy<Value = Node> {
    (
        kind(),
        prop_oneof![Just("default".to_string()), Just("prod".to_string())],
        dns_name(),
        label_set(),
        label_set(),
        prop_oneof![Just("a.yaml"), Just("b.yaml"), Just("")],
    )
        .prop_map(|(kind, namespace, name, labels, selector, file)| {
            let mut node = Node::new(kind, namespace, name)
                .with_source_file(file)
                .with_labels(labels);
            if let KindPayload::Service(spec) = &mut node.payload {
                *spec = ServiceSpec {
                    selector,
                    ..ServiceSpec::default()
                };
            }
            node
        })
}

fn graph_of(nodes: &[Node]) -> Graph {
    let mut graph = Graph::new();
    for node in nodes {
        graph.add_node(node.clone());
    }
    graph
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The id is a pure function of (kind, namespace, name).
    #[test]
    fn id_determinism(kind in kind(), namespace in dns_name(), name in dns_name()) {
        let a = NodeId::derive(&kind, &namespace, &name);
        let b = NodeId::derive(&kind, &namespace, &name);
        prop_assert_eq!(&a, &b);
        let expected = format!("{}/{}/{}", kind.as_str().to_lowercase(), namespace, name);
        prop_assert_eq!(a.as_str(), expected.as_str());
    }

    /// Distinct identities never share an id.
    #[test]
    fn id_collision_free(
        a in (kind(), dns_name(), dns_name()),
        b in (kind(), dns_name(), dns_name()),
    ) {
        let id_a = NodeId::derive(&a.0, &a.1, &a.2);
        let id_b = NodeId::derive(&b.0, &b.1, &b.2);
        prop_assert_eq!(id_a == id_b, a == b);
    }

    /// Re-running inference on an unchanged store yields the same edges,
    /// and every edge joins two stored nodes.
    #[test]
    fn inference_is_pure_and_total(nodes in vec(node(), 0..20)) {
        let mut graph = graph_of(&nodes);
        Converter::infer_edges(&mut graph);
        let first = graph.edges().to_vec();
        Converter::infer_edges(&mut graph);

        prop_assert_eq!(graph.edges(), first.as_slice());
        for edge in graph.edges() {
            prop_assert!(graph.contains_node(&edge.from));
            prop_assert!(graph.contains_node(&edge.to));
        }
    }

    /// merge(G, G) leaves G unchanged, duplicates included.
    #[test]
    fn merge_idempotence(nodes in vec(node(), 0..20)) {
        let mut graph = graph_of(&nodes);
        let before = graph.clone();
        Converter::merge(&mut graph, &before);
        prop_assert_eq!(graph, before);
    }

    /// Every node beyond the first of an identity gets one duplicate error.
    #[test]
    fn duplicate_findings_count(nodes in vec(node(), 0..20)) {
        let graph = graph_of(&nodes);
        let distinct: std::collections::BTreeSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();

        let duplicates = Validator::run(&graph)
            .iter()
            .filter(|f| f.message.starts_with("Duplicate "))
            .count();
        prop_assert_eq!(duplicates, nodes.len() - distinct.len());
    }

    /// Every node with a source file is a member of that file's record.
    #[test]
    fn file_membership_holds(nodes in vec(node(), 0..20), remove in 0usize..20) {
        let mut graph = graph_of(&nodes);
        if let Some(victim) = nodes.get(remove) {
            graph.remove_node(&victim.id);
        }

        for node in graph.nodes() {
            if node.source_file.is_empty() {
                continue;
            }
            let record = graph.file(&node.source_file);
            prop_assert!(record.is_some_and(|r| r.objects.contains(&node.id)));
        }
    }
}
