//! Record identifiers and their allocation.

use crate::error::CoreError;
use crate::tier::{Tier, TIER_SPAN};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Unique identifier of a record in the registry.
///
/// The identifier space is partitioned into one range per [`Tier`], so the
/// tier of a record can be read straight off its id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u64", into = "u64")]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw value, treating 0 as "no record".
    pub fn from_raw(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    /// Returns the raw integer value.
    pub fn get(self) -> u64 {
        self.0
    }

    /// The tier encoded in this identifier.
    pub fn tier(self) -> Option<Tier> {
        Tier::of_raw(self.0)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for NodeId {
    type Error = CoreError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or_else(|| CoreError::InvalidNodeId(raw.to_string()))
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl FromStr for NodeId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .trim()
            .parse::<u64>()
            .map_err(|_| CoreError::InvalidNodeId(s.to_string()))?;
        Self::try_from(raw)
    }
}

/// Issues identifiers from per-tier monotonic counters.
///
/// Each registry owns exactly one allocator. Counters start at zero, so the
/// first identifier of a tier is `tier.base() + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    counters: [u64; 5],
}

impl IdAllocator {
    /// Creates an allocator with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next identifier of `tier`.
    ///
    /// A tier can hold `TIER_SPAN - 1` identifiers, far beyond anything the
    /// ingestion work budget lets a caller mint.
    pub fn allocate(&mut self, tier: Tier) -> NodeId {
        let counter = &mut self.counters[tier.index()];
        *counter += 1;
        debug_assert!(*counter < TIER_SPAN, "tier {} exhausted", tier);
        NodeId(tier.base() + *counter)
    }

    /// Number of identifiers issued so far for `tier`.
    pub fn issued(&self, tier: Tier) -> u64 {
        self.counters[tier.index()]
    }

    /// Per-tier issue counts, outermost tier first.
    pub fn counts(&self) -> [u64; 5] {
        self.counters
    }

    /// Total identifiers issued across every tier.
    pub fn total(&self) -> u64 {
        self.counters.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_ids_per_tier() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.allocate(Tier::Project).get(), 1_000_000_000_001);
        assert_eq!(alloc.allocate(Tier::Building).get(), 2_000_000_000_001);
        assert_eq!(alloc.allocate(Tier::Component).get(), 5_000_000_000_001);
        assert_eq!(alloc.allocate(Tier::Component).get(), 5_000_000_000_002);
    }

    #[test]
    fn test_tier_recovered_from_id() {
        let mut alloc = IdAllocator::new();
        for tier in Tier::ALL {
            for _ in 0..3 {
                assert_eq!(alloc.allocate(tier).tier(), Some(tier));
            }
        }
        assert_eq!(alloc.counts(), [3, 3, 3, 3, 3]);
        assert_eq!(alloc.total(), 15);
    }

    #[test]
    fn test_fresh_allocators_are_independent() {
        let mut a = IdAllocator::new();
        let mut b = IdAllocator::new();
        a.allocate(Tier::Space);
        a.allocate(Tier::Space);
        assert_eq!(b.allocate(Tier::Space).get(), Tier::Space.base() + 1);
        assert_eq!(a.issued(Tier::Space), 2);
    }

    #[test]
    fn test_zero_is_not_an_id() {
        assert_eq!(NodeId::from_raw(0), None);
        assert_eq!(NodeId::from_raw(7).map(NodeId::get), Some(7));
        assert_eq!("2000000000003".parse::<NodeId>().unwrap().tier(), Some(Tier::Building));
    }

    #[test]
    fn test_zero_and_garbage_do_not_parse() {
        assert_eq!(
            "0".parse::<NodeId>(),
            Err(CoreError::InvalidNodeId("0".into()))
        );
        assert!("-4".parse::<NodeId>().is_err());
        assert!("building".parse::<NodeId>().is_err());

        assert!(serde_json::from_str::<NodeId>("0").is_err());
        let id: NodeId = serde_json::from_str("4000000000002").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "4000000000002");
    }
}
