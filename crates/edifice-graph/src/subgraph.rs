//! Bounded subgraph extraction.
//!
//! Breadth-first walk of the containment hierarchy from a root. Only
//! child links are followed to discover nodes; lateral edges are collected
//! afterwards for every visited node. The walk is capped by a node ceiling
//! and fails fast instead of returning a truncated graph. Callers with
//! bigger graphs split them by subtree.

use crate::error::{RegistryError, Result};
use crate::registry::Registry;
use edifice_core::{Edge, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// A root, everything it contains, and their lateral edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    /// Visited identifiers in BFS order, root first.
    pub ids: Vec<NodeId>,
    /// Records for `ids`, same order.
    pub nodes: Vec<Node>,
    /// Edge entries stored at each visited node, concatenated in visit order.
    pub edges: Vec<Edge>,
}

impl Subgraph {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.contains(&id)
    }
}

impl Registry {
    /// Extracts the subgraph under `root` using the configured ceiling.
    pub fn subgraph(&self, root: NodeId) -> Result<Subgraph> {
        self.subgraph_with_limit(root, self.config.max_subgraph_nodes)
    }

    /// Extracts the subgraph under `root`, visiting at most `limit` nodes.
    pub fn subgraph_with_limit(&self, root: NodeId, limit: usize) -> Result<Subgraph> {
        let root_node = self.records.get(root).ok_or(RegistryError::NotFound(root))?;
        if limit == 0 {
            return Err(Self::ceiling_hit(1, limit));
        }

        let mut ids = vec![root];
        let mut nodes = vec![root_node.clone()];
        let mut visited: HashSet<NodeId> = HashSet::from([root]);
        let mut queue: VecDeque<NodeId> = VecDeque::from([root]);

        while let Some(current) = queue.pop_front() {
            for &child in self.hierarchy.children_of(current) {
                if !visited.insert(child) {
                    continue;
                }
                if visited.len() > limit {
                    return Err(Self::ceiling_hit(visited.len(), limit));
                }
                let node = self.records.get(child).ok_or(RegistryError::NotFound(child))?;

                ids.push(child);
                nodes.push(node.clone());
                queue.push_back(child);
            }
        }

        let edges: Vec<Edge> = ids
            .iter()
            .flat_map(|id| self.adjacency.edges_of(*id).iter().cloned())
            .collect();

        debug!(
            "Subgraph of {}: {} nodes, {} edges",
            root,
            ids.len(),
            edges.len()
        );

        Ok(Subgraph { ids, nodes, edges })
    }

    fn ceiling_hit(requested: usize, limit: usize) -> RegistryError {
        RegistryError::CapacityExceeded {
            resource: "subgraph nodes",
            requested: requested as u64,
            limit: limit as u64,
        }
    }
}
