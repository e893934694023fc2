//! # Graph Summary
//!
//! Counts over one store, for status displays. Informational only.

use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts describing a Graph Store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub file_count: usize,
    pub dirty_file_count: usize,
    /// Node count per kind name.
    pub kinds: BTreeMap<String, usize>,
    /// Edge count per relation wire name.
    pub relations: BTreeMap<String, usize>,
}

impl GraphSummary {
    /// Compute the summary of a graph.
    #[must_use]
    pub fn from_graph(graph: &Graph) -> Self {
        let mut kinds = BTreeMap::new();
        for node in graph.nodes() {
            *kinds.entry(node.kind.to_string()).or_insert(0) += 1;
        }

        let mut relations = BTreeMap::new();
        for edge in graph.edges() {
            *relations.entry(edge.relation.to_string()).or_insert(0) += 1;
        }

        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            file_count: graph.files().count(),
            dirty_file_count: graph.dirty_files().len(),
            kinds,
            relations,
        }
    }
}
