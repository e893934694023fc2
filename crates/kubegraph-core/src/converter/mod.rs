//! # Converter
//!
//! Manifest text <-> graph.
//!
//! The Converter is stateless. Every operation takes the Graph it works on
//! explicitly:
//! - [`Converter::parse`] turns text into nodes and a file record
//! - [`Converter::ingest`] loads a parsed file into a store
//! - [`Converter::infer_edges`] recomputes every edge from node state
//! - [`Converter::to_manifest_text`] regenerates one file
//! - [`Converter::merge`] folds one store into another

pub mod infer;
pub mod parse;
pub mod render;

pub use infer::{compute_edges, selector_matches};
pub use parse::{ParseReport, ParsedManifest};
pub use render::render_manifest;

use crate::graph::Graph;
use crate::types::{KubegraphError, NodeId};
use std::collections::BTreeMap;

/// The Converter handles translation between manifests and the graph.
pub struct Converter;

impl Converter {
    /// Parse a (possibly multi-document) manifest text.
    ///
    /// Malformed documents and documents without `kind` or `metadata.name`
    /// are skipped and counted in the report.
    pub fn parse(text: &str, file_path: &str) -> ParsedManifest {
        parse::parse(text, file_path)
    }

    /// Load a manifest file into `graph` as freshly read from its source.
    ///
    /// Nodes previously loaded from `file_path` are removed first, the new
    /// nodes are appended (duplicates are kept for the Validator), and the
    /// file record is installed clean with the text and version token.
    pub fn ingest(
        graph: &mut Graph,
        text: &str,
        file_path: &str,
        sha: Option<String>,
    ) -> ParseReport {
        let ParsedManifest {
            nodes,
            mut file,
            report,
        } = Self::parse(text, file_path);

        graph.evict_file_nodes(file_path);
        for node in nodes {
            graph.add_node(node);
        }
        file.sha = sha;
        graph.install_file(file);

        tracing::info!(
            file = file_path,
            nodes = report.parsed,
            skipped = report.skipped(),
            "ingested manifest"
        );
        report
    }

    /// Recompute the whole edge set of `graph` from current node state.
    pub fn infer_edges(graph: &mut Graph) {
        infer::infer_edges(graph);
    }

    /// Regenerate the manifest text for `file_path`.
    pub fn to_manifest_text(graph: &Graph, file_path: &str) -> Result<String, KubegraphError> {
        render::to_manifest_text(graph, file_path)
    }

    /// Fold `source` into `target`.
    ///
    /// Each source node overwrites the target node with the same id (the
    /// n-th duplicate overwrites the n-th), or is appended. File records
    /// absent from `target` are copied; present ones get the union of both
    /// member sets. Edges are not merged; re-run inference afterwards.
    pub fn merge(target: &mut Graph, source: &Graph) {
        let mut occurrences: BTreeMap<&NodeId, usize> = BTreeMap::new();
        for node in source.nodes() {
            let occurrence = occurrences.entry(&node.id).or_insert(0);
            target.upsert_node(node.clone(), *occurrence);
            *occurrence += 1;
        }

        for record in source.files() {
            match target.file_mut(&record.path) {
                Some(existing) => existing.union_objects(&record.objects),
                None => target.install_file(record.clone()),
            }
        }

        tracing::debug!(
            nodes = source.node_count(),
            files = source.files().count(),
            "merged graph"
        );
    }
}

// =============================================================================
// TESTS
// =============================================================================
