//! Lateral adjacency between records.
//!
//! Each record has an ordered list of outgoing edge entries. A bidirectional
//! edge is materialized twice: the forward entry at its source and a
//! mirrored entry at its target.

use crate::error::{RegistryError, Result};
use crate::records::RecordStore;
use edifice_core::{Edge, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const NO_EDGES: &[Edge] = &[];

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AdjacencyStore {
    edges: HashMap<NodeId, Vec<Edge>>,
    entries: usize,
}

impl AdjacencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an edge. Both endpoints must exist.
    pub fn connect(&mut self, records: &RecordStore, edge: Edge) -> Result<()> {
        for endpoint in [edge.from, edge.to] {
            if !records.contains(endpoint) {
                return Err(RegistryError::NotFound(endpoint));
            }
        }

        if edge.bidirectional {
            let mirror = edge.mirrored();
            self.push(edge);
            self.push(mirror);
        } else {
            self.push(edge);
        }
        Ok(())
    }

    /// Edge entries stored at `id`, in insertion order.
    pub fn edges_of(&self, id: NodeId) -> &[Edge] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(NO_EDGES)
    }

    /// Total stored entries, mirrored entries included.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    fn push(&mut self, edge: Edge) {
        self.edges.entry(edge.from).or_default().push(edge);
        self.entries += 1;
    }
}
