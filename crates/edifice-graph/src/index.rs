//! Exact-match lookup from external keys to identifiers.
//!
//! Three independent maps, one per key kind. Keys are not unique across
//! ingestions: a later insert with the same key replaces the earlier
//! mapping.

use edifice_core::{ExternalKeys, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Which external key a lookup goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Element,
    Global,
    Vertex,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Element => "element",
            Self::Global => "global",
            Self::Vertex => "vertex",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SecondaryIndexSet {
    by_element: HashMap<String, NodeId>,
    by_global: HashMap<String, NodeId>,
    by_vertex: HashMap<String, NodeId>,
}

impl SecondaryIndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes every non-empty key of a record. Empty keys are skipped.
    pub fn insert(&mut self, id: NodeId, keys: &ExternalKeys) {
        let entries = [
            (KeyKind::Element, &keys.element_key),
            (KeyKind::Global, &keys.global_key),
            (KeyKind::Vertex, &keys.vertex_key),
        ];
        for (kind, key) in entries {
            if key.is_empty() {
                continue;
            }
            if let Some(previous) = self.map_mut(kind).insert(key.clone(), id) {
                if previous != id {
                    debug!("{} key {:?} remapped {} -> {}", kind, key, previous, id);
                }
            }
        }
    }

    pub fn lookup(&self, kind: KeyKind, key: &str) -> Option<NodeId> {
        self.map(kind).get(key).copied()
    }

    /// Number of entries in one of the maps.
    pub fn len(&self, kind: KeyKind) -> usize {
        self.map(kind).len()
    }

    fn map(&self, kind: KeyKind) -> &HashMap<String, NodeId> {
        match kind {
            KeyKind::Element => &self.by_element,
            KeyKind::Global => &self.by_global,
            KeyKind::Vertex => &self.by_vertex,
        }
    }

    fn map_mut(&mut self, kind: KeyKind) -> &mut HashMap<String, NodeId> {
        match kind {
            KeyKind::Element => &mut self.by_element,
            KeyKind::Global => &mut self.by_global,
            KeyKind::Vertex => &mut self.by_vertex,
        }
    }
}
