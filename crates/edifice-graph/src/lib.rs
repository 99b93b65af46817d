//! Edifice Graph - building graph registry
//!
//! This crate mirrors an extracted building graph into uniquely owned,
//! typed records. It keeps two relations side by side:
//!
//! - a strict containment hierarchy (project, building, storey, space,
//!   component), with exclusive parents and ordered children
//! - lateral adjacency (walls touching, doors connecting spaces), optionally
//!   mirrored in both directions
//!
//! Ownership of a record cascades through the hierarchy on transfer.
//! Records carry a construction status and an append-only verification
//! trail.
//!
//! # Example
//!
//! ```
//! use edifice_core::{NodeDescriptor, NodeId, Principal, Tier};
//! use edifice_graph::{MintRequest, Registry, RegistryConfig};
//!
//! let minter = Principal::new("minter").unwrap();
//! let mut registry = Registry::new(minter.clone(), RegistryConfig::default());
//!
//! let building = NodeId::from_raw(Tier::Building.base() + 1).unwrap();
//! let request = MintRequest::new("alice", "file-1", "HQ").with_nodes(vec![
//!     NodeDescriptor::new(Tier::Building, "building-001"),
//!     NodeDescriptor::new(Tier::Space, "space-001").with_parent(building),
//! ]);
//! let receipt = registry.mint(&minter, request).unwrap();
//!
//! assert_eq!(registry.lookup_by_element_key("building-001"), Some(building));
//! assert_eq!(registry.children_of(building), &[receipt.minted[1]]);
//! ```

mod adjacency;
mod clock;
mod compose;
mod config;
mod error;
mod events;
mod hierarchy;
mod index;
mod ingest;
mod ownership;
mod records;
mod registry;
mod store;
mod subgraph;

pub use adjacency::AdjacencyStore;
pub use clock::Clock;
pub use compose::{BottomUpComposable, RootOwnership, TopDownComposable};
pub use config::{RegistryConfig, WorkCost};
pub use error::{RegistryError, Result};
pub use events::{EventLog, RegistryEvent};
pub use hierarchy::HierarchyTracker;
pub use index::{KeyKind, SecondaryIndexSet};
pub use ingest::{MintReceipt, MintRequest};
pub use ownership::{OwnershipLedger, TransferReport};
pub use records::{RecordStore, StatusChange};
pub use registry::{Registry, RegistryStats};
pub use store::{RegistryStore, StoreError};
pub use subgraph::Subgraph;
