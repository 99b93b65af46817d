//! Lateral (non-containment) edges.
//!
//! The extraction tooling refers to nodes by their position in the exported
//! node array, so an `EdgeDescriptor` carries indexes. Once the nodes have
//! identifiers, a descriptor resolves into an `Edge`.

use crate::identity::NodeId;
use serde::{Deserialize, Serialize};

fn default_properties() -> String {
    "{}".to_string()
}

/// An edge as exported by the extraction tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDescriptor {
    /// Position of the source node in the ingested node array.
    pub from_index: usize,
    /// Position of the target node in the ingested node array.
    pub to_index: usize,
    #[serde(default)]
    pub connection_type: String,
    /// Opaque property payload, stored verbatim.
    #[serde(default = "default_properties")]
    pub properties: String,
    #[serde(default)]
    pub edge_key: String,
    #[serde(default)]
    pub bidirectional: bool,
}

impl EdgeDescriptor {
    pub fn new(from_index: usize, to_index: usize, connection_type: impl Into<String>) -> Self {
        Self {
            from_index,
            to_index,
            connection_type: connection_type.into(),
            properties: default_properties(),
            edge_key: String::new(),
            bidirectional: false,
        }
    }

    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    pub fn with_key(mut self, edge_key: impl Into<String>) -> Self {
        self.edge_key = edge_key.into();
        self
    }

    pub fn with_properties(mut self, properties: impl Into<String>) -> Self {
        self.properties = properties.into();
        self
    }

    /// Resolves the descriptor against the identifiers minted for each position.
    ///
    /// Returns `None` when either index is out of bounds.
    pub fn resolve(&self, minted: &[NodeId]) -> Option<Edge> {
        let from = *minted.get(self.from_index)?;
        let to = *minted.get(self.to_index)?;

        Some(Edge {
            from,
            to,
            from_index: self.from_index,
            to_index: self.to_index,
            connection_type: self.connection_type.clone(),
            properties: self.properties.clone(),
            edge_key: self.edge_key.clone(),
            bidirectional: self.bidirectional,
        })
    }
}

/// A stored edge between two records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    /// Array position the source was ingested at.
    pub from_index: usize,
    /// Array position the target was ingested at.
    pub to_index: usize,
    pub connection_type: String,
    pub properties: String,
    pub edge_key: String,
    pub bidirectional: bool,
}

impl Edge {
    /// The reverse entry stored at the target of a bidirectional edge.
    pub fn mirrored(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            from_index: self.to_index,
            to_index: self.from_index,
            connection_type: self.connection_type.clone(),
            properties: self.properties.clone(),
            edge_key: self.edge_key.clone(),
            bidirectional: self.bidirectional,
        }
    }
}
