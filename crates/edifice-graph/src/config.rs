//! Registry configuration and resource ceilings.

use serde::{Deserialize, Serialize};

/// Work-unit prices used to bound a single ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkCost {
    /// Fixed cost of an ingestion, root record included.
    pub base: u64,
    pub per_node: u64,
    pub per_edge: u64,
}

impl Default for WorkCost {
    fn default() -> Self {
        Self {
            base: 200_000,
            per_node: 150_000,
            per_edge: 50_000,
        }
    }
}

impl WorkCost {
    /// Estimated work for ingesting `nodes` nodes and `edges` edges.
    pub fn estimate(&self, nodes: usize, edges: usize) -> u64 {
        self.base
            .saturating_add(self.per_node.saturating_mul(nodes as u64))
            .saturating_add(self.per_edge.saturating_mul(edges as u64))
    }

    /// Largest node count that fits `budget` alongside `edges` edges.
    pub fn max_nodes(&self, budget: u64, edges: usize) -> u64 {
        let fixed = self.estimate(0, edges);
        if fixed > budget || self.per_node == 0 {
            return 0;
        }
        (budget - fixed) / self.per_node
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Ceiling on estimated work for one `mint` call.
    pub work_budget: u64,
    /// Ceiling on nodes visited by one `subgraph` call.
    pub max_subgraph_nodes: usize,
    pub cost: WorkCost,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            work_budget: 30_000_000,
            max_subgraph_nodes: 1_000,
            cost: WorkCost::default(),
        }
    }
}
