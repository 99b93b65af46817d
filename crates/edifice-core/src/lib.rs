//! Edifice Core - building graph data model
//!
//! This crate defines the values that flow into and out of the Edifice
//! registry: tiers, identifiers, node and edge records, principals, and the
//! descriptors produced by the offline graph-extraction tooling.
//!
//! # Identifiers
//!
//! Identifiers are partitioned by tier. The project tier owns
//! `1_000_000_000_001..2_000_000_000_000`, the building tier the next range,
//! and so on down to components. The tier of any record can therefore be
//! recovered from its id alone.
//!
//! # Example
//!
//! ```
//! use edifice_core::{IdAllocator, Tier};
//!
//! let mut ids = IdAllocator::new();
//! let wall = ids.allocate(Tier::Component);
//! assert_eq!(wall.tier(), Some(Tier::Component));
//! ```

pub mod edge;
pub mod error;
pub mod identity;
pub mod keys;
pub mod node;
pub mod principal;
pub mod tier;
pub mod uri;
pub mod validate;

pub use edge::{Edge, EdgeDescriptor};
pub use error::{CoreError, Result};
pub use identity::{IdAllocator, NodeId};
pub use keys::{fixed_key, key_hex, key_text, plain_key, text_key_hex};
pub use node::{
    ConstructionStatus, Coordinates, ExternalKeys, Node, NodeDescriptor, VerificationRecord,
};
pub use principal::Principal;
pub use tier::{Tier, TIER_SPAN};
pub use uri::GraphUri;
pub use validate::{validate_batch, ValidationIssue};
