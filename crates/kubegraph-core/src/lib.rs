//! # kubegraph-core
//!
//! The manifest graph engine for kubegraph.
//!
//! Kubernetes manifests are turned into a typed graph of resources, the
//! relations between them are inferred, the graph is checked by a rule
//! battery, and edited nodes are turned back into manifest text.
//!
//! ## Components
//!
//! - `graph` - the Graph Store: nodes, derived edges, file records, dirty
//!   tracking
//! - `converter` - manifest text <-> graph, edge inference, merge
//! - `validation` - the Validator rule battery and its findings
//! - `formats` - the JSON snapshot contract and content digests
//!
//! ## Architectural Constraints
//!
//! - Synchronous and single-threaded; no I/O, no async, no network
//! - No global state: every operation takes the Graph it works on
//! - Best-effort ingestion: malformed input is skipped, never fatal
//! - Edges are derived data, recomputed only by the inference pass

// =============================================================================
// MODULES
// =============================================================================

pub mod converter;
pub mod formats;
pub mod graph;
pub mod mutation;
pub mod primitives;
pub mod summary;
pub mod types;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Container, Edge, FileRecord, KindPayload, KubegraphError, Labels, Node, NodeId, PortValue,
    RelationType, ResourceKind, ServicePort, ServiceSpec, Visual, WorkloadSpec,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use converter::{Converter, ParseReport, ParsedManifest, render_manifest, selector_matches};
pub use graph::Graph;
pub use mutation::FieldUpdate;
pub use summary::GraphSummary;
pub use validation::{Finding, Findings, Severity, Validator};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{GraphSnapshot, WireNode, content_digest, graph_from_json, graph_to_json};
