//! # Validator
//!
//! Stateless rule battery over one graph snapshot.
//!
//! Rules run in a fixed order and every finding is reported; nothing here
//! fails. Only `Severity::Error` findings should block an apply step.
//!
//! | Rule | Severity |
//! |------|----------|
//! | Duplicate `(kind, namespace, name)` | error |
//! | Required field missing or empty | error |
//! | Deployment selector not in its labels | error |
//! | Service selector matches no workload | warning |
//! | Service port out of range | error |
//! | Deployment container image empty / has whitespace | error / warning |

mod rules;

use crate::graph::Graph;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// FINDINGS
// =============================================================================

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub node_id: NodeId,
    /// Dotted manifest path the finding is about.
    pub field: String,
    pub message: String,
    pub severity: Severity,
    pub file_path: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.severity, self.node_id, self.field, self.message
        )
    }
}

/// The findings of one validation run, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Findings(pub Vec<Finding>);

impl Findings {
    /// Whether any error exists, optionally only for `node_id`.
    #[must_use]
    pub fn has_errors(&self, node_id: Option<&NodeId>) -> bool {
        self.0
            .iter()
            .filter(|f| node_id.is_none_or(|id| &f.node_id == id))
            .any(|f| f.severity == Severity::Error)
    }

    /// No error at all. Warnings and infos are advisory.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.has_errors(None)
    }

    pub fn for_node<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a Finding> {
        self.0.iter().filter(move |f| &f.node_id == node_id)
    }

    pub fn for_file<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.0.iter().filter(move |f| f.file_path == path)
    }

    /// Number of findings with `severity`.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.0.iter().filter(|f| f.severity == severity).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.0.iter()
    }
}

// =============================================================================
// VALIDATOR
// =============================================================================

/// The Validator runs every rule over a graph.
pub struct Validator;

impl Validator {
    /// Run the full rule battery.
    pub fn run(graph: &Graph) -> Findings {
        let mut findings = Vec::new();

        rules::duplicate_names(graph, &mut findings);
        rules::required_fields(graph, &mut findings);
        rules::selector_consistency(graph, &mut findings);
        rules::service_reachability(graph, &mut findings);
        rules::port_ranges(graph, &mut findings);
        rules::container_images(graph, &mut findings);

        let findings = Findings(findings);
        tracing::debug!(
            nodes = graph.node_count(),
            errors = findings.count(Severity::Error),
            warnings = findings.count(Severity::Warning),
            "validated graph"
        );
        findings
    }
}
