//! The registry: records, indexes, hierarchy, adjacency and ownership.
//!
//! `Registry` is the single shared object every operation works against.
//! Mutating methods take `&mut self`, so the borrow checker gives the
//! serialized-mutation model for free. Reads always see committed state.
//!
//! Ingestion lives in `ingest`, cascading transfer in `ownership`, and
//! bounded traversal in `subgraph`; each adds an `impl Registry` block.

use crate::adjacency::AdjacencyStore;
use crate::clock::Clock;
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::events::{EventLog, RegistryEvent};
use crate::hierarchy::HierarchyTracker;
use crate::index::{KeyKind, SecondaryIndexSet};
use crate::ownership::OwnershipLedger;
use crate::records::{RecordStore, StatusChange};
use edifice_core::{
    ConstructionStatus, Edge, GraphUri, IdAllocator, Node, NodeId, Principal, Tier,
    VerificationRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// The building graph registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    /// The only principal allowed to mint.
    pub(crate) minter: Principal,
    pub(crate) config: RegistryConfig,
    #[serde(skip)]
    pub(crate) clock: Clock,
    pub(crate) allocator: IdAllocator,
    pub(crate) records: RecordStore,
    pub(crate) index: SecondaryIndexSet,
    pub(crate) hierarchy: HierarchyTracker,
    pub(crate) adjacency: AdjacencyStore,
    pub(crate) ownership: OwnershipLedger,
    pub(crate) events: EventLog,
}

impl Registry {
    /// Creates an empty registry whose ingestion is gated on `minter`.
    pub fn new(minter: Principal, config: RegistryConfig) -> Self {
        Self {
            minter,
            config,
            clock: Clock::default(),
            allocator: IdAllocator::new(),
            records: RecordStore::new(),
            index: SecondaryIndexSet::new(),
            hierarchy: HierarchyTracker::new(),
            adjacency: AdjacencyStore::new(),
            ownership: OwnershipLedger::new(),
            events: EventLog::new(),
        }
    }

    /// Replaces the timestamp source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    pub fn minter(&self) -> &Principal {
        &self.minter
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RegistryConfig) {
        self.config = config;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.records.get(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.records.contains(id)
    }

    /// Tier of an identifier, by range membership only.
    ///
    /// Does not consult storage: an id that was never issued still reports
    /// the tier of its range.
    pub fn type_of(id: NodeId) -> Option<Tier> {
        id.tier()
    }

    pub fn lookup(&self, kind: KeyKind, key: &str) -> Option<NodeId> {
        self.index.lookup(kind, key)
    }

    pub fn lookup_by_element_key(&self, key: &str) -> Option<NodeId> {
        self.lookup(KeyKind::Element, key)
    }

    pub fn lookup_by_global_key(&self, key: &str) -> Option<NodeId> {
        self.lookup(KeyKind::Global, key)
    }

    pub fn lookup_by_vertex_key(&self, key: &str) -> Option<NodeId> {
        self.lookup(KeyKind::Vertex, key)
    }

    pub fn children_of(&self, parent: NodeId) -> &[NodeId] {
        self.hierarchy.children_of(parent)
    }

    pub fn parent_of(&self, child: NodeId) -> Option<NodeId> {
        self.hierarchy.parent_of(child)
    }

    pub fn edges_of(&self, id: NodeId) -> &[Edge] {
        self.adjacency.edges_of(id)
    }

    pub fn owner_of(&self, id: NodeId) -> Option<&Principal> {
        self.ownership.owner_of(id)
    }

    /// Number of records `owner` holds.
    pub fn balance_of(&self, owner: &Principal) -> usize {
        self.ownership.balance_of(owner)
    }

    /// Identifiers issued per tier, every tier listed.
    pub fn counts_by_tier(&self) -> BTreeMap<Tier, u64> {
        Tier::ALL
            .iter()
            .map(|tier| (*tier, self.allocator.issued(*tier)))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.records.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.records.iter()
    }

    /// URI pointing back at the record's element in the source graph.
    pub fn graph_uri(&self, id: NodeId) -> Result<GraphUri> {
        let node = self.records.get(id).ok_or(RegistryError::NotFound(id))?;
        Ok(GraphUri::from(&node.keys))
    }

    /// Events recorded since the last drain.
    pub fn events(&self) -> &[RegistryEvent] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        self.events.drain()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Per-record mutation
    // ─────────────────────────────────────────────────────────────────────

    /// Fails unless `caller` owns `id` or is a delegate of its owner.
    pub(crate) fn authorize(&self, caller: &Principal, id: NodeId, action: &'static str) -> Result<()> {
        let owner = self
            .ownership
            .owner_of(id)
            .ok_or(RegistryError::NotFound(id))?;

        if self.ownership.is_authorized(caller, owner) {
            Ok(())
        } else {
            warn!("{} denied: {} does not control {}", action, caller, id);
            Err(RegistryError::not_authorized(caller, action))
        }
    }

    /// Sets the construction status of a record.
    pub fn update_status(
        &mut self,
        caller: &Principal,
        id: NodeId,
        status: ConstructionStatus,
    ) -> Result<()> {
        if !self.records.contains(id) {
            return Err(RegistryError::NotFound(id));
        }
        self.authorize(caller, id, "update status")?;

        let change = self.records.set_status(id, status)?;
        debug!("Status of {}: {} -> {}", id, change.old, change.new);
        self.record_status_change(id, change);
        Ok(())
    }

    /// Appends a verification to a record's audit trail.
    ///
    /// The caller is recorded as verifier. An approving verification of a
    /// `Completed` record advances it to `Verified`.
    pub fn append_verification(
        &mut self,
        caller: &Principal,
        id: NodeId,
        document: impl Into<String>,
        note: impl Into<String>,
        approved: bool,
    ) -> Result<()> {
        if !self.records.contains(id) {
            return Err(RegistryError::NotFound(id));
        }
        self.authorize(caller, id, "append verification")?;

        let record = VerificationRecord {
            verifier: caller.clone(),
            recorded_at: self.clock.now(),
            document: document.into(),
            note: note.into(),
            approved,
        };
        let advanced = self.records.append_verification(id, record)?;

        self.events.record(RegistryEvent::VerificationAdded {
            id,
            verifier: caller.clone(),
            approved,
        });
        if let Some(change) = advanced {
            info!("{} verified by {}", id, caller);
            self.record_status_change(id, change);
        }
        Ok(())
    }

    fn record_status_change(&mut self, id: NodeId, change: StatusChange) {
        self.events.record(RegistryEvent::StatusChanged {
            id,
            old: change.old,
            new: change.new,
        });
    }

    /// Approves or revokes `delegate` acting for `owner` on all its records.
    pub fn set_delegate(&mut self, owner: &Principal, delegate: &Principal, approved: bool) {
        self.ownership.set_delegate(owner, delegate, approved);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Re-parenting
    // ─────────────────────────────────────────────────────────────────────

    /// Attaches a parentless record under `parent`.
    ///
    /// The caller must control `child`. Attaching under one of the child's
    /// own descendants is rejected.
    pub fn attach_child(&mut self, caller: &Principal, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.records.contains(parent) {
            return Err(RegistryError::NotFound(parent));
        }
        if !self.records.contains(child) {
            return Err(RegistryError::NotFound(child));
        }
        self.authorize(caller, child, "attach child")?;
        if self.hierarchy.would_cycle(parent, child) {
            return Err(RegistryError::WouldCycle { parent, child });
        }

        self.hierarchy.attach(&mut self.records, parent, child)?;
        self.events.record(RegistryEvent::ChildAttached { parent, child });
        Ok(())
    }

    /// Detaches `child` from `parent`. The caller must control `child`.
    pub fn detach_child(&mut self, caller: &Principal, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.records.contains(child) {
            return Err(RegistryError::NotFound(child));
        }
        self.authorize(caller, child, "detach child")?;

        self.hierarchy.detach(&mut self.records, parent, child)?;
        self.events.record(RegistryEvent::ChildDetached { parent, child });
        Ok(())
    }

    /// Moves `child` under `new_parent` in one call.
    ///
    /// Validates the whole ancestor chain of `new_parent` first, then
    /// detaches and attaches. Nothing changes if validation fails.
    pub fn reparent(&mut self, caller: &Principal, child: NodeId, new_parent: NodeId) -> Result<()> {
        if !self.records.contains(new_parent) {
            return Err(RegistryError::NotFound(new_parent));
        }
        if !self.records.contains(child) {
            return Err(RegistryError::NotFound(child));
        }
        self.authorize(caller, child, "reparent")?;
        if self.hierarchy.would_cycle(new_parent, child) {
            return Err(RegistryError::WouldCycle {
                parent: new_parent,
                child,
            });
        }

        if let Some(old) = self.hierarchy.parent_of(child) {
            if old == new_parent {
                return Ok(());
            }
            self.hierarchy.detach(&mut self.records, old, child)?;
            self.events.record(RegistryEvent::ChildDetached { parent: old, child });
        }
        self.hierarchy.attach(&mut self.records, new_parent, child)?;
        self.events.record(RegistryEvent::ChildAttached {
            parent: new_parent,
            child,
        });
        Ok(())
    }

    /// Summary counters.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            node_count: self.records.len(),
            edge_entries: self.adjacency.entry_count(),
            hierarchy_links: self.hierarchy.link_count(),
            by_tier: self.counts_by_tier(),
            events_recorded: self.events.recorded(),
        }
    }
}

/// Registry statistics for the status command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub node_count: usize,
    pub edge_entries: usize,
    pub hierarchy_links: usize,
    pub by_tier: BTreeMap<Tier, u64>,
    pub events_recorded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{MintReceipt, MintRequest};
    use chrono::{TimeZone, Utc};
    use edifice_core::NodeDescriptor;

    fn p(name: &str) -> Principal {
        Principal::new(name).unwrap()
    }

    /// root -> building -> storey -> space, owned by alice.
    fn setup() -> (Registry, MintReceipt) {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut reg = Registry::new(p("minter"), RegistryConfig::default()).with_clock(Clock::Fixed(at));
        let building = NodeId::from_raw(Tier::Building.base() + 1).unwrap();
        let storey = NodeId::from_raw(Tier::Storey.base() + 1).unwrap();
        let request = MintRequest::new("alice", "file-1", "HQ").with_nodes(vec![
            NodeDescriptor::new(Tier::Building, "b"),
            NodeDescriptor::new(Tier::Storey, "s").with_parent(building),
            NodeDescriptor::new(Tier::Space, "r").with_parent(storey),
        ]);
        let receipt = reg.mint(&p("minter"), request).unwrap();
        reg.drain_events();
        (reg, receipt)
    }

    #[test]
    fn test_type_of_is_pure() {
        let never_issued = NodeId::from_raw(Tier::Space.base() + 12345).unwrap();
        assert_eq!(Registry::type_of(never_issued), Some(Tier::Space));
        assert_eq!(Registry::type_of(NodeId::from_raw(17).unwrap()), None);
    }

    #[test]
    fn test_update_status() {
        let (mut reg, receipt) = setup();
        let space = receipt.minted[2];

        reg.update_status(&p("alice"), space, ConstructionStatus::UnderConstruction)
            .unwrap();
        assert_eq!(reg.get(space).unwrap().status, ConstructionStatus::UnderConstruction);
        assert_eq!(
            reg.events(),
            &[RegistryEvent::StatusChanged {
                id: space,
                old: ConstructionStatus::Designed,
                new: ConstructionStatus::UnderConstruction,
            }]
        );
    }

    #[test]
    fn test_update_status_rejections() {
        let (mut reg, receipt) = setup();
        let ghost = NodeId::from_raw(Tier::Space.base() + 500).unwrap();

        assert_eq!(
            reg.update_status(&p("alice"), ghost, ConstructionStatus::Approved),
            Err(RegistryError::NotFound(ghost))
        );
        let err = reg
            .update_status(&p("mallory"), receipt.minted[0], ConstructionStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotAuthorized { .. }));
        assert_eq!(reg.get(receipt.minted[0]).unwrap().status, ConstructionStatus::Designed);
        assert!(reg.events().is_empty());
    }

    #[test]
    fn test_delegate_can_act() {
        let (mut reg, receipt) = setup();
        let id = receipt.minted[0];

        reg.set_delegate(&p("alice"), &p("site-manager"), true);
        reg.update_status(&p("site-manager"), id, ConstructionStatus::Approved)
            .unwrap();

        reg.set_delegate(&p("alice"), &p("site-manager"), false);
        assert!(reg
            .update_status(&p("site-manager"), id, ConstructionStatus::Completed)
            .is_err());
    }

    #[test]
    fn test_verification_trail_and_auto_advance() {
        let (mut reg, receipt) = setup();
        let id = receipt.minted[1];
        reg.update_status(&p("alice"), id, ConstructionStatus::Completed)
            .unwrap();
        reg.drain_events();

        reg.append_verification(&p("alice"), id, "report-1", "snag list open", false)
            .unwrap();
        reg.append_verification(&p("alice"), id, "report-2", "all clear", true)
            .unwrap();

        let node = reg.get(id).unwrap();
        assert_eq!(node.status, ConstructionStatus::Verified);
        assert_eq!(node.verifications.len(), 2);
        assert_eq!(node.verifications[1].document, "report-2");
        assert_eq!(node.verifications[1].verifier, p("alice"));
        assert_eq!(
            node.verifications[0].recorded_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );

        let names: Vec<&str> = reg.events().iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["verification_added", "verification_added", "status_changed"]
        );
    }

    #[test]
    fn test_verification_requires_control() {
        let (mut reg, receipt) = setup();
        let err = reg
            .append_verification(&p("bob"), receipt.minted[0], "d", "n", true)
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotAuthorized { .. }));
        assert!(reg.get(receipt.minted[0]).unwrap().verifications.is_empty());
    }

    #[test]
    fn test_detach_then_attach() {
        let (mut reg, receipt) = setup();
        let (building, storey, space) = (receipt.minted[0], receipt.minted[1], receipt.minted[2]);

        assert_eq!(
            reg.attach_child(&p("alice"), building, space),
            Err(RegistryError::AlreadyParented {
                child: space,
                parent: storey
            })
        );

        reg.detach_child(&p("alice"), storey, space).unwrap();
        assert_eq!(reg.parent_of(space), None);
        reg.attach_child(&p("alice"), building, space).unwrap();
        assert_eq!(reg.children_of(building), &[storey, space]);
    }

    #[test]
    fn test_attach_under_descendant_rejected() {
        let (mut reg, receipt) = setup();
        let (building, storey, space) = (receipt.minted[0], receipt.minted[1], receipt.minted[2]);

        reg.detach_child(&p("alice"), receipt.root, building).unwrap();
        assert_eq!(
            reg.attach_child(&p("alice"), space, building),
            Err(RegistryError::WouldCycle {
                parent: space,
                child: building
            })
        );
        assert_eq!(reg.parent_of(building), None);
        assert_eq!(reg.parent_of(storey), Some(building));
    }

    #[test]
    fn test_reparent() {
        let (mut reg, receipt) = setup();
        let (building, storey, space) = (receipt.minted[0], receipt.minted[1], receipt.minted[2]);

        reg.reparent(&p("alice"), space, building).unwrap();
        assert_eq!(reg.parent_of(space), Some(building));
        assert!(reg.children_of(storey).is_empty());
        assert_eq!(reg.get(space).unwrap().parent, Some(building));

        assert_eq!(
            reg.reparent(&p("alice"), building, storey),
            Err(RegistryError::WouldCycle {
                parent: storey,
                child: building
            })
        );
        assert_eq!(reg.parent_of(building), Some(receipt.root));

        let err = reg.reparent(&p("bob"), space, storey).unwrap_err();
        assert!(matches!(err, RegistryError::NotAuthorized { .. }));
    }

    #[test]
    fn test_graph_uri() {
        let (reg, receipt) = setup();
        let uri = reg.graph_uri(receipt.minted[0]).unwrap();
        assert_eq!(uri.element_key, "b");
        assert_eq!(uri.to_string(), "graph://b/vertex//global/");
    }

    #[test]
    fn test_stats() {
        let (reg, _) = setup();
        let stats = reg.stats();
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.hierarchy_links, 3);
        assert_eq!(stats.edge_entries, 0);
        assert_eq!(stats.by_tier[&Tier::Project], 1);
        assert_eq!(stats.events_recorded, 5);
    }

    #[test]
    fn test_balance_follows_transfer() {
        let (mut reg, receipt) = setup();
        assert_eq!(reg.balance_of(&p("alice")), 4);
        assert_eq!(reg.balance_of(&p("bob")), 0);

        reg.transfer(&p("alice"), &p("alice"), &p("bob"), receipt.minted[1])
            .unwrap();
        assert_eq!(reg.balance_of(&p("alice")), 2);
        assert_eq!(reg.balance_of(&p("bob")), 2);
    }

    #[test]
    fn test_attach_after_lenient_detach_rejects_cycle() {
        let (mut reg, receipt) = setup();
        let (building, storey) = (receipt.minted[0], receipt.minted[1]);

        // detaching from the wrong parent leaves the storey listed under the building
        reg.detach_child(&p("alice"), receipt.root, storey).unwrap();
        reg.detach_child(&p("alice"), receipt.root, building).unwrap();

        assert_eq!(
            reg.attach_child(&p("alice"), storey, building),
            Err(RegistryError::WouldCycle {
                parent: storey,
                child: building
            })
        );
        assert_eq!(reg.children_of(storey), &[receipt.minted[2]]);
        assert_eq!(reg.parent_of(building), None);
        assert_eq!(
            reg.reparent(&p("alice"), building, storey),
            Err(RegistryError::WouldCycle {
                parent: storey,
                child: building
            })
        );
    }
}
