//! Advisory checks for an exported batch before it is minted.
//!
//! Minting itself is lenient about edges (out-of-range edges are dropped),
//! so tooling runs these checks first to surface export problems.

use crate::edge::EdgeDescriptor;
use crate::node::NodeDescriptor;
use serde::Serialize;

/// A problem found in an exported batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    EmptyBatch,
    MissingField { node: usize, field: &'static str },
    EdgeOutOfRange { edge: usize, index: usize, len: usize },
    MissingConnectionType { edge: usize },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyBatch => write!(f, "No nodes provided"),
            Self::MissingField { node, field } => {
                write!(f, "Node {}: missing required field '{}'", node, field)
            }
            Self::EdgeOutOfRange { edge, index, len } => write!(
                f,
                "Edge {}: index {} outside node array of length {}",
                edge, index, len
            ),
            Self::MissingConnectionType { edge } => {
                write!(f, "Edge {}: missing connection type", edge)
            }
        }
    }
}

/// Checks a batch and returns every issue found, in input order.
pub fn validate_batch(nodes: &[NodeDescriptor], edges: &[EdgeDescriptor]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if nodes.is_empty() {
        issues.push(ValidationIssue::EmptyBatch);
        return issues;
    }

    for (idx, node) in nodes.iter().enumerate() {
        let required = [
            ("elementKey", &node.element_key),
            ("globalKey", &node.global_key),
            ("entityType", &node.entity_type),
            ("name", &node.name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                issues.push(ValidationIssue::MissingField { node: idx, field });
            }
        }
    }

    for (idx, edge) in edges.iter().enumerate() {
        for index in [edge.from_index, edge.to_index] {
            if index >= nodes.len() {
                issues.push(ValidationIssue::EdgeOutOfRange {
                    edge: idx,
                    index,
                    len: nodes.len(),
                });
            }
        }
        if edge.connection_type.trim().is_empty() {
            issues.push(ValidationIssue::MissingConnectionType { edge: idx });
        }
    }

    issues
}
