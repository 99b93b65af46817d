//! Registry error taxonomy.
//!
//! Every variant is a structured rejection: the operation that returned it
//! made no change to the registry.

use edifice_core::{NodeId, Principal};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Record not found: {0}")]
    NotFound(NodeId),

    #[error("{caller} is not authorized to {action}")]
    NotAuthorized {
        caller: Principal,
        action: &'static str,
    },

    #[error("Record {child} already has parent {parent}")]
    AlreadyParented { child: NodeId, parent: NodeId },

    #[error("Record {0} already exists")]
    DuplicateRecord(NodeId),

    #[error("Attaching {child} under {parent} would create a cycle")]
    WouldCycle { parent: NodeId, child: NodeId },

    #[error("{resource} ceiling exceeded: {requested} > {limit}")]
    CapacityExceeded {
        resource: &'static str,
        requested: u64,
        limit: u64,
    },
}

impl RegistryError {
    pub(crate) fn not_authorized(caller: &Principal, action: &'static str) -> Self {
        Self::NotAuthorized {
            caller: caller.clone(),
            action,
        }
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
