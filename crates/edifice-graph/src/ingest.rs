//! Bulk ingestion of an extracted building graph.
//!
//! Minting is a single unit of work done in two phases:
//!
//! 1. **Plan**: allocate identifiers on a copy of the allocator, build every
//!    record, resolve hierarchy links and edges, and run every check that can
//!    reject the batch. The registry is not touched.
//! 2. **Commit**: apply the plan to the stores and publish the events.
//!
//! A rejected mint leaves no trace: no identifiers consumed, no index
//! entries, no links, no events.

use crate::error::{RegistryError, Result};
use crate::events::RegistryEvent;
use crate::registry::Registry;
use edifice_core::{
    plain_key, Edge, EdgeDescriptor, IdAllocator, Node, NodeDescriptor, NodeId, Principal, Tier,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Everything needed to mint one building graph.
///
/// This is also the JSON document the CLI reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    /// Principal that will own every minted record.
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub source_file: String,
    /// Name given to the project root.
    #[serde(default)]
    pub label: String,
    pub nodes: Vec<NodeDescriptor>,
    #[serde(default)]
    pub edges: Vec<EdgeDescriptor>,
}

impl MintRequest {
    pub fn new(owner: impl Into<String>, source_file: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            source_file: source_file.into(),
            label: label.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_nodes(mut self, nodes: Vec<NodeDescriptor>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_edges(mut self, edges: Vec<EdgeDescriptor>) -> Self {
        self.edges = edges;
        self
    }
}

/// Result of a successful mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintReceipt {
    /// The project-tier root created for this ingestion.
    pub root: NodeId,
    /// Identifier minted for each supplied node, in input order.
    pub minted: Vec<NodeId>,
    pub edges_created: usize,
    /// Edges skipped because an index was out of bounds.
    pub edges_dropped: usize,
    pub work_units: u64,
}

/// A fully validated mint, ready to apply.
struct PendingMint {
    allocator: IdAllocator,
    owner: Principal,
    source_file: String,
    root: Node,
    nodes: Vec<Node>,
    /// (parent, child) in wiring order.
    links: Vec<(NodeId, NodeId)>,
    edges: Vec<Edge>,
    edges_dropped: usize,
}

impl Registry {
    /// Mints a building graph under a fresh project root.
    ///
    /// Only the registry's minting principal may call this. Every supplied
    /// node is minted with `owner` as owner and `Designed` status. Nodes with
    /// a declared parent are attached there; all others go under the root.
    /// Edges reference nodes by array position; edges with an out-of-bounds
    /// position are dropped without error.
    pub fn mint(&mut self, caller: &Principal, request: MintRequest) -> Result<MintReceipt> {
        if caller != &self.minter {
            return Err(RegistryError::not_authorized(caller, "mint"));
        }
        let owner = Principal::new(request.owner.as_str())
            .map_err(|_| RegistryError::InvalidArgument("owner must not be empty".into()))?;
        if request.nodes.is_empty() {
            return Err(RegistryError::InvalidArgument("node list must not be empty".into()));
        }

        let work_units = self
            .config
            .cost
            .estimate(request.nodes.len(), request.edges.len());
        if work_units > self.config.work_budget {
            warn!(
                "Mint of {} nodes rejected: at most {} fit the work budget with {} edges",
                request.nodes.len(),
                self.config
                    .cost
                    .max_nodes(self.config.work_budget, request.edges.len()),
                request.edges.len()
            );
            return Err(RegistryError::CapacityExceeded {
                resource: "work units",
                requested: work_units,
                limit: self.config.work_budget,
            });
        }

        let pending = self.plan_mint(owner, &request)?;
        let receipt = self.commit_mint(pending, work_units)?;

        info!(
            "Minted graph {} from {:?}: {} nodes, {} edges ({} dropped)",
            receipt.root,
            request.source_file,
            receipt.minted.len(),
            receipt.edges_created,
            receipt.edges_dropped
        );
        Ok(receipt)
    }

    fn plan_mint(&self, owner: Principal, request: &MintRequest) -> Result<PendingMint> {
        let now = self.clock.now();
        let mut allocator = self.allocator.clone();

        let root_id = allocator.allocate(Tier::Project);
        let root = Node::root(root_id, &request.label, &plain_key(&request.source_file), now);

        let mut nodes = Vec::with_capacity(request.nodes.len());
        for desc in &request.nodes {
            let tier = desc.resolved_tier();
            let id = allocator.allocate(tier);
            nodes.push(Node::from_descriptor(id, tier, desc, now));
        }
        let minted: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();

        // Only a snapshot restored over a stale allocator can collide.
        if let Some(taken) = std::iter::once(root_id)
            .chain(minted.iter().copied())
            .find(|id| self.records.get(*id).is_some())
        {
            return Err(RegistryError::DuplicateRecord(taken));
        }

        let staged: HashSet<NodeId> = minted.iter().copied().chain([root_id]).collect();
        let mut staged_parents: HashMap<NodeId, NodeId> = HashMap::new();
        let mut links = Vec::with_capacity(minted.len());

        for (desc, &child) in request.nodes.iter().zip(&minted) {
            let parent = desc.parent.unwrap_or(root_id);

            if !staged.contains(&parent) && !self.records.contains(parent) {
                return Err(RegistryError::NotFound(parent));
            }
            if self.staged_ancestry_contains(&staged_parents, parent, child) {
                return Err(RegistryError::WouldCycle { parent, child });
            }

            staged_parents.insert(child, parent);
            links.push((parent, child));
        }

        let mut edges = Vec::with_capacity(request.edges.len());
        let mut edges_dropped = 0;
        for (idx, desc) in request.edges.iter().enumerate() {
            match desc.resolve(&minted) {
                Some(edge) => edges.push(edge),
                None => {
                    debug!(
                        "Dropping edge {} ({} -> {}): index out of bounds for {} nodes",
                        idx,
                        desc.from_index,
                        desc.to_index,
                        minted.len()
                    );
                    edges_dropped += 1;
                }
            }
        }

        Ok(PendingMint {
            allocator,
            owner,
            source_file: request.source_file.clone(),
            root,
            nodes,
            links,
            edges,
            edges_dropped,
        })
    }

    /// Whether `needle` lies on the parent chain starting at `start`,
    /// following staged links first, then committed ones.
    fn staged_ancestry_contains(
        &self,
        staged_parents: &HashMap<NodeId, NodeId>,
        start: NodeId,
        needle: NodeId,
    ) -> bool {
        let mut current = Some(start);
        let mut budget = staged_parents.len() + self.hierarchy.link_count() + 1;

        while let Some(id) = current {
            if id == needle {
                return true;
            }
            if budget == 0 {
                return false;
            }
            budget -= 1;
            current = staged_parents
                .get(&id)
                .copied()
                .or_else(|| self.hierarchy.parent_of(id));
        }
        false
    }

    fn commit_mint(&mut self, pending: PendingMint, work_units: u64) -> Result<MintReceipt> {
        let PendingMint {
            allocator,
            owner,
            source_file,
            root,
            nodes,
            links,
            edges,
            edges_dropped,
        } = pending;

        let root_id = root.id;
        let minted: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        let mut events = Vec::with_capacity(nodes.len() + edges.len() + 2);

        for node in std::iter::once(root).chain(nodes) {
            let id = node.id;
            events.push(RegistryEvent::NodeMinted {
                id,
                tier: node.tier,
                owner: owner.clone(),
                element_key: node.keys.element_key.clone(),
            });
            let keys = node.keys.clone();
            self.records.create(node)?;
            self.index.insert(id, &keys);
            self.ownership.set_owner(id, owner.clone());
            debug!("Minted {} for {}", id, owner);
        }

        self.allocator = allocator;

        for (parent, child) in links {
            self.hierarchy.attach(&mut self.records, parent, child)?;
        }

        let edges_created = edges.len();
        for edge in edges {
            events.push(RegistryEvent::EdgeCreated {
                from: edge.from,
                to: edge.to,
                connection_type: edge.connection_type.clone(),
                bidirectional: edge.bidirectional,
            });
            self.adjacency.connect(&self.records, edge)?;
        }

        events.push(RegistryEvent::GraphMinted {
            root: root_id,
            owner,
            source_file,
            nodes: minted.len(),
            edges: edges_created,
        });
        self.events.extend(events);

        Ok(MintReceipt {
            root: root_id,
            minted,
            edges_created,
            edges_dropped,
            work_units,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::index::KeyKind;
    use chrono::Utc;
    use edifice_core::ConstructionStatus;

    fn p(name: &str) -> Principal {
        Principal::new(name).unwrap()
    }

    fn registry() -> Registry {
        Registry::new(p("minter"), RegistryConfig::default())
    }

    fn component(key: &str) -> NodeDescriptor {
        NodeDescriptor::new(Tier::Component, key).with_name(key)
    }

    #[test]
    fn test_building_with_space() {
        let mut reg = registry();
        let building_id = NodeId::from_raw(Tier::Building.base() + 1).unwrap();
        let request = MintRequest::new("alice", "file-1", "HQ").with_nodes(vec![
            NodeDescriptor::new(Tier::Building, "building-001"),
            NodeDescriptor::new(Tier::Space, "space-001").with_parent(building_id),
        ]);

        let receipt = reg.mint(&p("minter"), request).unwrap();
        let (building, space) = (receipt.minted[0], receipt.minted[1]);

        assert_eq!(building, building_id);
        assert_eq!(reg.lookup_by_element_key("building-001"), Some(building));
        assert_eq!(reg.children_of(building), &[space]);
        assert_eq!(reg.children_of(receipt.root), &[building]);
        assert_eq!(reg.parent_of(space), Some(building));
        assert_eq!(reg.get(space).unwrap().parent, Some(building));
    }

    #[test]
    fn test_registry_fields_forced() {
        let mut reg = registry();
        let mut desc = component("c1");
        desc.source_file_key = "f".into();
        let receipt = reg
            .mint(&p("minter"), MintRequest::new("alice", "f", "P").with_nodes(vec![desc]))
            .unwrap();

        let node = reg.get(receipt.minted[0]).unwrap();
        assert_eq!(node.status, ConstructionStatus::Designed);
        assert!(node.exists);
        assert_eq!(reg.owner_of(node.id), Some(&p("alice")));

        let root = reg.get(receipt.root).unwrap();
        assert_eq!(root.tier, Tier::Project);
        assert_eq!(root.name, "P");
        assert_eq!(root.source_file, "f");
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut reg = registry();
        let first = reg
            .mint(
                &p("minter"),
                MintRequest::new("alice", "f", "A").with_nodes(vec![component("a"), component("b")]),
            )
            .unwrap();
        let second = reg
            .mint(
                &p("minter"),
                MintRequest::new("bob", "f", "B").with_nodes(vec![
                    component("c"),
                    component("d"),
                    component("e"),
                ]),
            )
            .unwrap();

        let all: HashSet<NodeId> = first.minted.iter().chain(&second.minted).copied().collect();
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|id| Registry::type_of(*id) == Some(Tier::Component)));
        assert_ne!(first.root, second.root);
    }

    #[test]
    fn test_counts_by_tier() {
        let mut reg = registry();
        let before = reg.counts_by_tier();
        reg.mint(
            &p("minter"),
            MintRequest::new("alice", "f", "P").with_nodes(vec![
                NodeDescriptor::new(Tier::Building, "b"),
                NodeDescriptor::new(Tier::Storey, "s"),
                component("c1"),
                component("c2"),
            ]),
        )
        .unwrap();

        let after = reg.counts_by_tier();
        assert_eq!(after[&Tier::Project] - before[&Tier::Project], 1);
        assert_eq!(after[&Tier::Building], 1);
        assert_eq!(after[&Tier::Storey], 1);
        assert_eq!(after[&Tier::Space], 0);
        assert_eq!(after[&Tier::Component], 2);
    }

    #[test]
    fn test_every_minted_record_owned_by_owner() {
        let mut reg = registry();
        let receipt = reg
            .mint(
                &p("minter"),
                MintRequest::new("alice", "f", "P").with_nodes(vec![component("a"), component("b")]),
            )
            .unwrap();
        for id in receipt.minted.iter().chain([&receipt.root]) {
            assert_eq!(reg.owner_of(*id), Some(&p("alice")));
        }
    }

    #[test]
    fn test_preconditions() {
        let mut reg = registry();

        let err = reg
            .mint(&p("mallory"), MintRequest::new("alice", "f", "P").with_nodes(vec![component("a")]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotAuthorized { .. }));

        let err = reg
            .mint(&p("minter"), MintRequest::new("  ", "f", "P").with_nodes(vec![component("a")]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));

        let err = reg
            .mint(&p("minter"), MintRequest::new("alice", "f", "P"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));

        assert_eq!(reg.node_count(), 0);
        assert!(reg.events().is_empty());
    }

    #[test]
    fn test_work_budget() {
        let mut config = RegistryConfig::default();
        config.work_budget = config.cost.estimate(2, 0);
        assert_eq!(config.cost.max_nodes(config.work_budget, 0), 2);
        assert_eq!(config.cost.max_nodes(config.work_budget, 1), 1);
        let mut reg = Registry::new(p("minter"), config);

        let three = MintRequest::new("alice", "f", "P")
            .with_nodes(vec![component("a"), component("b"), component("c")]);
        let err = reg.mint(&p("minter"), three).unwrap_err();
        assert!(matches!(err, RegistryError::CapacityExceeded { .. }));

        let two = MintRequest::new("alice", "f", "P").with_nodes(vec![component("a"), component("b")]);
        assert!(reg.mint(&p("minter"), two).is_ok());
    }

    #[test]
    fn test_unknown_parent_rejects_whole_batch() {
        let mut reg = registry();
        let ghost = NodeId::from_raw(Tier::Building.base() + 77).unwrap();
        let request = MintRequest::new("alice", "f", "P")
            .with_nodes(vec![
                NodeDescriptor::new(Tier::Building, "b"),
                NodeDescriptor::new(Tier::Space, "s").with_parent(ghost),
            ])
            .with_edges(vec![EdgeDescriptor::new(0, 1, "adjacent")]);

        assert_eq!(reg.mint(&p("minter"), request), Err(RegistryError::NotFound(ghost)));

        assert_eq!(reg.node_count(), 0);
        assert_eq!(reg.lookup_by_element_key("b"), None);
        assert!(reg.counts_by_tier().values().all(|c| *c == 0));
        assert!(reg.events().is_empty());
    }

    #[test]
    fn test_taken_id_rejects_before_any_write() {
        let mut reg = registry();
        let taken = NodeId::from_raw(Tier::Space.base() + 1).unwrap();
        reg.records
            .create(Node::root(taken, "stale", "old", Utc::now()))
            .unwrap();

        let request = MintRequest::new("alice", "f", "P").with_nodes(vec![
            NodeDescriptor::new(Tier::Building, "b"),
            NodeDescriptor::new(Tier::Space, "s"),
        ]);
        assert_eq!(
            reg.mint(&p("minter"), request),
            Err(RegistryError::DuplicateRecord(taken))
        );

        assert_eq!(reg.node_count(), 1);
        assert_eq!(reg.lookup_by_element_key("b"), None);
        assert_eq!(reg.lookup_by_element_key("s"), None);
        assert!(reg.counts_by_tier().values().all(|c| *c == 0));
        assert_eq!(reg.owner_of(taken), None);
        assert!(reg.events().is_empty());
    }

    #[test]
    fn test_parent_later_in_batch() {
        let mut reg = registry();
        let storey_id = NodeId::from_raw(Tier::Storey.base() + 1).unwrap();
        let receipt = reg
            .mint(
                &p("minter"),
                MintRequest::new("alice", "f", "P").with_nodes(vec![
                    NodeDescriptor::new(Tier::Space, "s").with_parent(storey_id),
                    NodeDescriptor::new(Tier::Storey, "st"),
                ]),
            )
            .unwrap();
        assert_eq!(reg.parent_of(receipt.minted[0]), Some(storey_id));
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let mut reg = registry();
        let own = NodeId::from_raw(Tier::Space.base() + 1).unwrap();
        let request = MintRequest::new("alice", "f", "P")
            .with_nodes(vec![NodeDescriptor::new(Tier::Space, "s").with_parent(own)]);
        assert_eq!(
            reg.mint(&p("minter"), request),
            Err(RegistryError::WouldCycle { parent: own, child: own })
        );
        assert_eq!(reg.node_count(), 0);
    }

    #[test]
    fn test_parent_from_earlier_mint() {
        let mut reg = registry();
        let first = reg
            .mint(
                &p("minter"),
                MintRequest::new("alice", "f", "P")
                    .with_nodes(vec![NodeDescriptor::new(Tier::Building, "b")]),
            )
            .unwrap();
        let building = first.minted[0];

        let second = reg
            .mint(
                &p("minter"),
                MintRequest::new("alice", "f", "P2")
                    .with_nodes(vec![NodeDescriptor::new(Tier::Storey, "s").with_parent(building)]),
            )
            .unwrap();
        assert_eq!(reg.children_of(building), &[second.minted[0]]);
        assert!(reg.children_of(second.root).is_empty());
    }

    #[test]
    fn test_out_of_bounds_edge_dropped() {
        let mut reg = registry();
        let request = MintRequest::new("alice", "f", "P")
            .with_nodes(vec![component("a"), component("b")])
            .with_edges(vec![
                EdgeDescriptor::new(5, 0, "ghost"),
                EdgeDescriptor::new(0, 1, "adjacent"),
                EdgeDescriptor::new(1, 2, "ghost"),
            ]);

        let receipt = reg.mint(&p("minter"), request).unwrap();
        let (a, b) = (receipt.minted[0], receipt.minted[1]);

        assert_eq!(receipt.edges_created, 1);
        assert_eq!(receipt.edges_dropped, 2);
        assert_eq!(reg.edges_of(a).len(), 1);
        assert_eq!(reg.edges_of(a)[0].to, b);
        assert!(reg.edges_of(b).is_empty());
    }

    #[test]
    fn test_bidirectional_symmetry() {
        let mut reg = registry();
        let request = MintRequest::new("alice", "f", "P")
            .with_nodes(vec![component("a"), component("b")])
            .with_edges(vec![EdgeDescriptor::new(0, 1, "door").bidirectional().with_key("edge_0")]);

        let receipt = reg.mint(&p("minter"), request).unwrap();
        let (a, b) = (receipt.minted[0], receipt.minted[1]);

        let back = &reg.edges_of(b)[0];
        assert_eq!(back.to, a);
        assert_eq!(back.connection_type, "door");
        assert_eq!(back.edge_key, "edge_0");
    }

    #[test]
    fn test_events() {
        let mut reg = registry();
        let request = MintRequest::new("alice", "f", "P")
            .with_nodes(vec![component("a"), component("b")])
            .with_edges(vec![
                EdgeDescriptor::new(0, 1, "x").bidirectional(),
                EdgeDescriptor::new(0, 9, "dropped"),
            ]);
        let receipt = reg.mint(&p("minter"), request).unwrap();

        let events = reg.drain_events();
        let count = |name: &str| events.iter().filter(|e| e.name() == name).count();
        assert_eq!(count("node_minted"), 3);
        assert_eq!(count("edge_created"), 1);
        assert_eq!(count("graph_minted"), 1);
        assert_eq!(
            events.last(),
            Some(&RegistryEvent::GraphMinted {
                root: receipt.root,
                owner: p("alice"),
                source_file: "f".into(),
                nodes: 2,
                edges: 1,
            })
        );
    }

    #[test]
    fn test_indexes_and_collisions() {
        let mut reg = registry();
        let first = reg
            .mint(
                &p("minter"),
                MintRequest::new("alice", "f", "P")
                    .with_nodes(vec![component("shared").with_keys("v-1", "")]),
            )
            .unwrap();
        assert_eq!(reg.lookup(KeyKind::Vertex, "v-1"), Some(first.minted[0]));
        assert_eq!(reg.lookup_by_global_key(""), None);

        let second = reg
            .mint(&p("minter"), MintRequest::new("alice", "f", "P").with_nodes(vec![component("shared")]))
            .unwrap();
        assert_eq!(reg.lookup_by_element_key("shared"), Some(second.minted[0]));
        assert_eq!(reg.lookup_by_vertex_key("v-1"), Some(first.minted[0]));
    }

    #[test]
    fn test_tier_from_entity_type() {
        let mut reg = registry();
        let mut desc = NodeDescriptor::default().with_entity_type("IfcBuildingStorey");
        desc.element_key = "st".into();
        let receipt = reg
            .mint(&p("minter"), MintRequest::new("alice", "f", "P").with_nodes(vec![desc]))
            .unwrap();
        assert_eq!(Registry::type_of(receipt.minted[0]), Some(Tier::Storey));
    }

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "owner": "alice",
            "sourceFile": "file-123",
            "label": "HQ",
            "nodes": [
                {"tier": "building", "elementKey": "b1", "name": "Main"},
                {"tier": "space", "elementKey": "s1", "parent": 0}
            ],
            "edges": [{"fromIndex": 0, "toIndex": 1, "connectionType": "contains", "bidirectional": true}]
        }"#;
        let request: MintRequest = serde_json::from_str(json).unwrap();
        let mut reg = registry();
        let receipt = reg.mint(&p("minter"), request).unwrap();
        assert_eq!(receipt.minted.len(), 2);
        assert_eq!(reg.children_of(receipt.root).len(), 2);
        assert_eq!(reg.edges_of(receipt.minted[1]).len(), 1);
    }
}
