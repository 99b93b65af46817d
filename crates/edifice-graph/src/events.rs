//! Registry notifications.
//!
//! Every committed state transition appends an event to the journal.
//! External indexers drain the journal to mirror the registry off-line.

use edifice_core::{ConstructionStatus, NodeId, Principal, Tier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryEvent {
    NodeMinted {
        id: NodeId,
        tier: Tier,
        owner: Principal,
        element_key: String,
    },
    EdgeCreated {
        from: NodeId,
        to: NodeId,
        connection_type: String,
        bidirectional: bool,
    },
    /// Summary of one ingestion.
    GraphMinted {
        root: NodeId,
        owner: Principal,
        source_file: String,
        nodes: usize,
        edges: usize,
    },
    StatusChanged {
        id: NodeId,
        old: ConstructionStatus,
        new: ConstructionStatus,
    },
    VerificationAdded {
        id: NodeId,
        verifier: Principal,
        approved: bool,
    },
    OwnershipTransferred {
        id: NodeId,
        from: Principal,
        to: Principal,
    },
    ChildAttached {
        parent: NodeId,
        child: NodeId,
    },
    ChildDetached {
        parent: NodeId,
        child: NodeId,
    },
}

impl RegistryEvent {
    /// Short name for display and filtering.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NodeMinted { .. } => "node_minted",
            Self::EdgeCreated { .. } => "edge_created",
            Self::GraphMinted { .. } => "graph_minted",
            Self::StatusChanged { .. } => "status_changed",
            Self::VerificationAdded { .. } => "verification_added",
            Self::OwnershipTransferred { .. } => "ownership_transferred",
            Self::ChildAttached { .. } => "child_attached",
            Self::ChildDetached { .. } => "child_detached",
        }
    }
}

/// Append-only journal of events not yet drained.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventLog {
    pending: Vec<RegistryEvent>,
    /// Total events ever recorded, drained or not.
    recorded: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: RegistryEvent) {
        self.pending.push(event);
        self.recorded += 1;
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = RegistryEvent>) {
        for event in events {
            self.record(event);
        }
    }

    pub fn pending(&self) -> &[RegistryEvent] {
        &self.pending
    }

    /// Hands over all pending events, oldest first.
    pub fn drain(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn recorded(&self) -> u64 {
        self.recorded
    }
}
