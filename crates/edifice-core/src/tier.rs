//! Structural tiers of a building graph.
//!
//! Every record belongs to exactly one of five tiers, from the project
//! down to individual components. The tier is encoded into the record's
//! identifier, so it can always be recovered without a storage lookup.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Width of each tier's identifier range.
pub const TIER_SPAN: u64 = 1_000_000_000_000;

/// A structural level of the containment hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Root of a minted graph (one per ingestion).
    Project,
    /// A building inside a project.
    Building,
    /// A storey (floor) inside a building.
    Storey,
    /// A space (room, zone) inside a storey.
    Space,
    /// Physical component: wall, door, beam, ...
    Component,
}

impl Tier {
    /// All tiers, outermost first.
    pub const ALL: [Tier; 5] = [
        Tier::Project,
        Tier::Building,
        Tier::Storey,
        Tier::Space,
        Tier::Component,
    ];

    /// Zero-based position of the tier (0 = project).
    pub fn index(self) -> usize {
        match self {
            Self::Project => 0,
            Self::Building => 1,
            Self::Storey => 2,
            Self::Space => 3,
            Self::Component => 4,
        }
    }

    /// Tier at the given position, if any.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// First value of this tier's identifier range, exclusive.
    ///
    /// Identifiers of the tier are `base + n` for `n` in `1..TIER_SPAN`.
    pub fn base(self) -> u64 {
        (self.index() as u64 + 1) * TIER_SPAN
    }

    /// Recovers the tier from an identifier by range membership.
    ///
    /// Returns `None` for 0, for range bases themselves, and for values
    /// beyond the last tier.
    pub fn of_raw(id: u64) -> Option<Self> {
        if id % TIER_SPAN == 0 {
            return None;
        }
        let slot = id / TIER_SPAN;
        if slot == 0 {
            return None;
        }
        Self::from_index((slot - 1) as usize)
    }

    /// Maps an external entity type (e.g. `IfcWallStandardCase`) onto a tier.
    ///
    /// Matching is case-insensitive and substring based. Anything that is not
    /// recognisably a project, building, storey or space is a component.
    pub fn classify(entity_type: &str) -> Self {
        let lower = entity_type.to_lowercase();

        if lower.contains("project") {
            Self::Project
        } else if lower.contains("building") && !lower.contains("storey") {
            Self::Building
        } else if lower.contains("storey") || lower.contains("floor") {
            Self::Storey
        } else if lower.contains("space") || lower.contains("room") || lower.contains("zone") {
            Self::Space
        } else {
            Self::Component
        }
    }

    /// Returns the lowercase name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Building => "building",
            Self::Storey => "storey",
            Self::Space => "space",
            Self::Component => "component",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project" | "root" => Ok(Self::Project),
            "building" => Ok(Self::Building),
            "storey" => Ok(Self::Storey),
            "space" => Ok(Self::Space),
            "component" => Ok(Self::Component),
            other => Err(CoreError::UnknownTier(other.to_string())),
        }
    }
}
