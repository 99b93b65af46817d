//! Composability views of the registry.
//!
//! The registry answers two kinds of composition questions: top-down (which
//! records does this one contain?) and bottom-up (what contains this one?).
//! Both views need the owner at the top of a record's containment chain, so
//! `root_owner_of` lives on a shared supertrait and is implemented once.

use crate::error::{RegistryError, Result};
use crate::registry::Registry;
use edifice_core::{NodeId, Principal};

/// Owner of the topmost ancestor of a record.
pub trait RootOwnership {
    fn root_owner_of(&self, id: NodeId) -> Result<Principal>;
}

/// Parent-to-children view.
pub trait TopDownComposable: RootOwnership {
    fn child_ids(&self, parent: NodeId) -> Result<Vec<NodeId>>;

    fn child_count(&self, parent: NodeId) -> Result<usize> {
        Ok(self.child_ids(parent)?.len())
    }

    /// Child at `position` in the parent's current child order.
    fn child_by_index(&self, parent: NodeId, position: usize) -> Result<Option<NodeId>> {
        Ok(self.child_ids(parent)?.get(position).copied())
    }
}

/// Child-to-parent view.
pub trait BottomUpComposable: RootOwnership {
    fn parent_id(&self, child: NodeId) -> Result<Option<NodeId>>;

    /// Topmost ancestor of `id`, or `id` itself when it has no parent.
    fn root_id(&self, id: NodeId) -> Result<NodeId>;
}

impl RootOwnership for Registry {
    fn root_owner_of(&self, id: NodeId) -> Result<Principal> {
        if !self.records.contains(id) {
            return Err(RegistryError::NotFound(id));
        }
        let top = self.hierarchy.top_of(id);
        self.ownership
            .owner_of(top)
            .cloned()
            .ok_or(RegistryError::NotFound(top))
    }
}

impl TopDownComposable for Registry {
    fn child_ids(&self, parent: NodeId) -> Result<Vec<NodeId>> {
        if !self.records.contains(parent) {
            return Err(RegistryError::NotFound(parent));
        }
        Ok(self.hierarchy.children_of(parent).to_vec())
    }
}

impl BottomUpComposable for Registry {
    fn parent_id(&self, child: NodeId) -> Result<Option<NodeId>> {
        if !self.records.contains(child) {
            return Err(RegistryError::NotFound(child));
        }
        Ok(self.hierarchy.parent_of(child))
    }

    fn root_id(&self, id: NodeId) -> Result<NodeId> {
        if !self.records.contains(id) {
            return Err(RegistryError::NotFound(id));
        }
        Ok(self.hierarchy.top_of(id))
    }
}
