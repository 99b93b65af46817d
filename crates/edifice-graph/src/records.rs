//! Per-identifier record storage.
//!
//! The store owns each `Node`, including its status and audit trail. It does
//! no authorization; callers check ownership before mutating.

use crate::error::{RegistryError, Result};
use edifice_core::{ConstructionStatus, Node, NodeId, VerificationRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of a status write, for notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub old: ConstructionStatus,
    pub new: ConstructionStatus,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RecordStore {
    records: HashMap<NodeId, Node>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new record under its own id.
    ///
    /// Fails if a record already exists there. The allocator never reissues
    /// an id, so this only trips on a corrupted snapshot.
    pub fn create(&mut self, node: Node) -> Result<()> {
        if self.records.contains_key(&node.id) {
            return Err(RegistryError::DuplicateRecord(node.id));
        }
        self.records.insert(node.id, node);
        Ok(())
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.records.get(&id).is_some_and(|node| node.exists)
    }

    /// Overwrites the status. No ordering between statuses is enforced.
    pub fn set_status(&mut self, id: NodeId, status: ConstructionStatus) -> Result<StatusChange> {
        let node = self.get_mut(id)?;
        let old = node.status;
        node.status = status;
        Ok(StatusChange { old, new: status })
    }

    /// Appends to the audit trail.
    ///
    /// An approving record on a `Completed` node advances it to `Verified`;
    /// that transition is returned so it can be announced.
    pub fn append_verification(
        &mut self,
        id: NodeId,
        record: VerificationRecord,
    ) -> Result<Option<StatusChange>> {
        let node = self.get_mut(id)?;
        let advance = record.approved && node.status == ConstructionStatus::Completed;
        node.verifications.push(record);

        if advance {
            node.status = ConstructionStatus::Verified;
            return Ok(Some(StatusChange {
                old: ConstructionStatus::Completed,
                new: ConstructionStatus::Verified,
            }));
        }
        Ok(None)
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<()> {
        self.get_mut(id)?.parent = parent;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.records.values()
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.records.get_mut(&id).ok_or(RegistryError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use edifice_core::{IdAllocator, Principal, Tier};

    fn record(approved: bool) -> VerificationRecord {
        VerificationRecord {
            verifier: Principal::new("inspector").unwrap(),
            recorded_at: Utc::now(),
            document: "doc-1".into(),
            note: "site visit".into(),
            approved,
        }
    }

    fn store_with_one() -> (RecordStore, NodeId) {
        let mut ids = IdAllocator::new();
        let id = ids.allocate(Tier::Project);
        let mut store = RecordStore::new();
        store.create(Node::root(id, "HQ", "file-1", Utc::now())).unwrap();
        (store, id)
    }

    #[test]
    fn test_create_twice_fails() {
        let (mut store, id) = store_with_one();
        let dup = Node::root(id, "again", "file-1", Utc::now());
        assert_eq!(store.create(dup), Err(RegistryError::DuplicateRecord(id)));
        assert_eq!(store.get(id).unwrap().name, "HQ");
    }

    #[test]
    fn test_unknown_id() {
        let mut store = RecordStore::new();
        let id = NodeId::from_raw(3_000_000_000_001).unwrap();
        assert_eq!(
            store.set_status(id, ConstructionStatus::Approved),
            Err(RegistryError::NotFound(id))
        );
        assert_eq!(
            store.append_verification(id, record(true)),
            Err(RegistryError::NotFound(id))
        );
        assert!(!store.contains(id));
    }

    #[test]
    fn test_status_moves_freely() {
        let (mut store, id) = store_with_one();
        store.set_status(id, ConstructionStatus::Completed).unwrap();
        let change = store.set_status(id, ConstructionStatus::Designed).unwrap();
        assert_eq!(change.old, ConstructionStatus::Completed);
        assert_eq!(store.get(id).unwrap().status, ConstructionStatus::Designed);
    }

    #[test]
    fn test_approval_advances_completed() {
        let (mut store, id) = store_with_one();
        store.set_status(id, ConstructionStatus::Completed).unwrap();

        assert_eq!(store.append_verification(id, record(false)).unwrap(), None);
        assert_eq!(store.get(id).unwrap().status, ConstructionStatus::Completed);

        let change = store.append_verification(id, record(true)).unwrap();
        assert_eq!(change.map(|c| c.new), Some(ConstructionStatus::Verified));

        let node = store.get(id).unwrap();
        assert_eq!(node.status, ConstructionStatus::Verified);
        assert_eq!(node.verifications.len(), 2);
        assert!(!node.verifications[0].approved);
    }

    #[test]
    fn test_approval_elsewhere_does_not_advance() {
        let (mut store, id) = store_with_one();
        store.set_status(id, ConstructionStatus::UnderConstruction).unwrap();
        assert_eq!(store.append_verification(id, record(true)).unwrap(), None);
        assert_eq!(store.get(id).unwrap().status, ConstructionStatus::UnderConstruction);
    }
}
