//! Ownership ledger and cascading transfer.
//!
//! Every record has exactly one owner. An owner may approve delegates that
//! act on all of its records. Transferring a record also transfers every
//! descendant in the containment hierarchy that the sender still owns.

use crate::error::{RegistryError, Result};
use crate::events::RegistryEvent;
use crate::registry::Registry;
use edifice_core::{NodeId, Principal};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct OwnershipLedger {
    owners: HashMap<NodeId, Principal>,
    delegates: HashMap<Principal, BTreeSet<Principal>>,
}

impl OwnershipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner_of(&self, id: NodeId) -> Option<&Principal> {
        self.owners.get(&id)
    }

    /// Sets the owner of `id`, returning the previous one.
    pub fn set_owner(&mut self, id: NodeId, owner: Principal) -> Option<Principal> {
        self.owners.insert(id, owner)
    }

    pub fn set_delegate(&mut self, owner: &Principal, delegate: &Principal, approved: bool) {
        if approved {
            self.delegates
                .entry(owner.clone())
                .or_default()
                .insert(delegate.clone());
        } else if let Some(set) = self.delegates.get_mut(owner) {
            set.remove(delegate);
            if set.is_empty() {
                self.delegates.remove(owner);
            }
        }
    }

    pub fn is_delegate(&self, owner: &Principal, delegate: &Principal) -> bool {
        self.delegates
            .get(owner)
            .is_some_and(|set| set.contains(delegate))
    }

    /// True if `caller` is `owner` or one of its delegates.
    pub fn is_authorized(&self, caller: &Principal, owner: &Principal) -> bool {
        caller == owner || self.is_delegate(owner, caller)
    }

    /// Number of records owned by `owner`.
    pub fn balance_of(&self, owner: &Principal) -> usize {
        self.owners.values().filter(|o| *o == owner).count()
    }
}

/// Records reassigned by one transfer, in visit order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub reassigned: Vec<NodeId>,
    /// Descendants left alone because `from` no longer owned them.
    pub skipped: Vec<NodeId>,
}

impl Registry {
    /// Transfers `root` from `from` to `to`, cascading to descendants.
    ///
    /// The caller must be `from` or one of its delegates. Descendants are
    /// visited depth-first through the hierarchy, each at most once; those
    /// no longer owned by `from` are skipped together with their subtrees.
    /// If `root` already belongs to `to`, the call is a no-op.
    pub fn transfer(
        &mut self,
        caller: &Principal,
        from: &Principal,
        to: &Principal,
        root: NodeId,
    ) -> Result<TransferReport> {
        if !self.ownership.is_authorized(caller, from) {
            return Err(RegistryError::not_authorized(caller, "transfer"));
        }
        let current = self
            .ownership
            .owner_of(root)
            .ok_or(RegistryError::NotFound(root))?;

        if current == to {
            debug!("{} already owned by {}", root, to);
            return Ok(TransferReport::default());
        }
        if current != from {
            return Err(RegistryError::not_authorized(caller, "transfer a record it does not own"));
        }

        let mut report = TransferReport::default();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if self.ownership.owner_of(id) != Some(from) {
                report.skipped.push(id);
                continue;
            }

            self.ownership.set_owner(id, to.clone());
            self.events.record(RegistryEvent::OwnershipTransferred {
                id,
                from: from.clone(),
                to: to.clone(),
            });
            report.reassigned.push(id);

            // Reverse so the first child is visited first.
            stack.extend(self.hierarchy.children_of(id).iter().rev().copied());
        }

        info!(
            "Transferred {} records under {} from {} to {} ({} skipped)",
            report.reassigned.len(),
            root,
            from,
            to,
            report.skipped.len()
        );
        Ok(report)
    }
}
