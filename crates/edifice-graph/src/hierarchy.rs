//! Containment hierarchy: exclusive parent, ordered children.
//!
//! The tracker is the authority on parent/child links. Each `Node` also
//! carries a `parent` field, which `attach` and `detach` keep equal to the
//! tracker's parent pointer. Children lists can drift from the pointers: a
//! detach naming the wrong parent clears the pointer but leaves the list.
//!
//! A child must be detached before it can be attached again. Re-parenting
//! goes through `detach` then `attach`, never a direct overwrite.

use crate::error::{RegistryError, Result};
use crate::records::RecordStore;
use edifice_core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

const NO_CHILDREN: &[NodeId] = &[];

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HierarchyTracker {
    parents: HashMap<NodeId, NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
}

impl HierarchyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `child` under `parent`, appending it to the parent's children.
    ///
    /// Both records must exist, and `child` must not have a parent yet.
    /// Cycle checks are the caller's concern; see [`Self::would_cycle`].
    pub fn attach(&mut self, records: &mut RecordStore, parent: NodeId, child: NodeId) -> Result<()> {
        if !records.contains(parent) {
            return Err(RegistryError::NotFound(parent));
        }
        if !records.contains(child) {
            return Err(RegistryError::NotFound(child));
        }
        if let Some(existing) = self.parent_of(child) {
            return Err(RegistryError::AlreadyParented {
                child,
                parent: existing,
            });
        }

        self.children.entry(parent).or_default().push(child);
        self.parents.insert(child, parent);
        records.set_parent(child, Some(parent))
    }

    /// Unlinks `child` from `parent`.
    ///
    /// Removal swaps the last child into the vacated slot, so sibling order
    /// is not preserved. If `child` is not among `parent`'s children the list
    /// is left alone, but the child's parent pointer is still cleared.
    pub fn detach(&mut self, records: &mut RecordStore, parent: NodeId, child: NodeId) -> Result<()> {
        if !records.contains(child) {
            return Err(RegistryError::NotFound(child));
        }

        if let Some(list) = self.children.get_mut(&parent) {
            if let Some(pos) = list.iter().position(|c| *c == child) {
                list.swap_remove(pos);
            }
            if list.is_empty() {
                self.children.remove(&parent);
            }
        }

        self.parents.remove(&child);
        records.set_parent(child, None)
    }

    pub fn children_of(&self, parent: NodeId) -> &[NodeId] {
        self.children
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or(NO_CHILDREN)
    }

    pub fn parent_of(&self, child: NodeId) -> Option<NodeId> {
        self.parents.get(&child).copied()
    }

    /// Returns true if `ancestor` is `node` or lies on `node`'s parent chain.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        // The chain can't be longer than the number of links.
        let mut steps = self.parents.len() + 1;

        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            if steps == 0 {
                break;
            }
            steps -= 1;
            current = self.parent_of(id);
        }
        false
    }

    /// Returns true if `target` is `from` or can be reached from it through
    /// children lists.
    ///
    /// A lenient `detach` clears a child's parent pointer while leaving it in
    /// another list, so this can see links that `is_ancestor` cannot.
    pub fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut visited: HashSet<NodeId> = HashSet::from([from]);
        let mut queue: VecDeque<NodeId> = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            for &child in self.children_of(current) {
                if visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        false
    }

    /// Whether linking `child` under `parent` would close a loop, judged by
    /// both the parent pointers and the children lists.
    pub fn would_cycle(&self, parent: NodeId, child: NodeId) -> bool {
        self.is_ancestor(child, parent) || self.reaches(child, parent)
    }

    /// Walks up to the topmost ancestor of `node` (possibly `node` itself).
    pub fn top_of(&self, node: NodeId) -> NodeId {
        let mut current = node;
        let mut steps = self.parents.len();
        while let Some(parent) = self.parent_of(current) {
            if steps == 0 {
                break;
            }
            steps -= 1;
            current = parent;
        }
        current
    }

    /// Number of parent links.
    pub fn link_count(&self) -> usize {
        self.parents.len()
    }
}
