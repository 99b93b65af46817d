//! Node records and the descriptors they are minted from.
//!
//! A `NodeDescriptor` is what the extraction tooling hands us: everything
//! it knows about an element, with a tier and an optional declared parent.
//! A `Node` is the registry-side record created from it. Registry-owned
//! fields (status, existence flag, timestamp) are always overwritten at mint
//! time, whatever the descriptor carried.

use crate::error::CoreError;
use crate::keys::plain_key;
use crate::identity::NodeId;
use crate::principal::Principal;
use crate::tier::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Construction lifecycle of a record.
///
/// Transitions are caller-driven and unordered, except that an approving
/// verification of a `Completed` record advances it to `Verified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionStatus {
    /// Exists in the design model only. Every minted record starts here.
    #[default]
    Designed,
    /// Design signed off for construction.
    Approved,
    /// Work in progress on site.
    UnderConstruction,
    /// Built, pending verification.
    Completed,
    /// Built and verified by an approving inspection.
    Verified,
}

impl ConstructionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Designed => "designed",
            Self::Approved => "approved",
            Self::UnderConstruction => "under_construction",
            Self::Completed => "completed",
            Self::Verified => "verified",
        }
    }
}

impl std::fmt::Display for ConstructionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConstructionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "designed" => Ok(Self::Designed),
            "approved" => Ok(Self::Approved),
            "under_construction" => Ok(Self::UnderConstruction),
            "completed" => Ok(Self::Completed),
            "verified" => Ok(Self::Verified),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// Identifying keys of the element in external systems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalKeys {
    /// Element key in the source graph database.
    pub element_key: String,
    /// Vertex key from the topology extraction.
    pub vertex_key: String,
    /// Persistent global key of the design element.
    pub global_key: String,
}

/// Integer position in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Coordinates {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

/// One appended entry of a record's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub verifier: Principal,
    pub recorded_at: DateTime<Utc>,
    /// Reference to the supporting document (hash, URI, ...).
    pub document: String,
    pub note: String,
    pub approved: bool,
}

/// A node as described by the extraction tooling.
///
/// Field names follow the tooling's JSON export (camelCase).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    pub tier: Option<Tier>,
    #[serde(default)]
    pub element_key: String,
    #[serde(default)]
    pub vertex_key: String,
    #[serde(default)]
    pub global_key: String,
    /// External entity type, e.g. `IfcWall`.
    #[serde(default)]
    pub entity_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
    #[serde(default)]
    pub z: i64,
    #[serde(default)]
    pub source_file_key: String,
    #[serde(default)]
    pub container_key: String,
    /// Declared parent identifier. 0 in the export means none.
    #[serde(default, deserialize_with = "declared_parent")]
    pub parent: Option<NodeId>,
}

fn declared_parent<'de, D>(deserializer: D) -> Result<Option<NodeId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<u64>::deserialize(deserializer)?;
    Ok(raw.and_then(NodeId::from_raw))
}

impl NodeDescriptor {
    /// Creates a descriptor with the given tier and element key.
    pub fn new(tier: Tier, element_key: impl Into<String>) -> Self {
        Self {
            tier: Some(tier),
            element_key: element_key.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_keys(mut self, vertex_key: impl Into<String>, global_key: impl Into<String>) -> Self {
        self.vertex_key = vertex_key.into();
        self.global_key = global_key.into();
        self
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = entity_type.into();
        self
    }

    pub fn with_position(mut self, position: Coordinates) -> Self {
        self.x = position.x;
        self.y = position.y;
        self.z = position.z;
        self
    }

    /// The declared tier, or one derived from the entity type.
    pub fn resolved_tier(&self) -> Tier {
        self.tier.unwrap_or_else(|| Tier::classify(&self.entity_type))
    }
}

/// A record held by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub tier: Tier,
    pub keys: ExternalKeys,
    pub entity_type: String,
    pub name: String,
    pub position: Coordinates,
    pub source_file: String,
    pub container: String,
    pub status: ConstructionStatus,
    pub created_at: DateTime<Utc>,
    /// Current parent in the hierarchy. Mirrors the hierarchy tracker.
    pub parent: Option<NodeId>,
    pub exists: bool,
    pub verifications: Vec<VerificationRecord>,
}

impl Node {
    /// Creates the project-tier root of an ingestion.
    pub fn root(id: NodeId, label: &str, source_file: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            tier: Tier::Project,
            keys: ExternalKeys::default(),
            entity_type: String::new(),
            name: label.to_string(),
            position: Coordinates::default(),
            source_file: source_file.to_string(),
            container: String::new(),
            status: ConstructionStatus::Designed,
            created_at: now,
            parent: None,
            exists: true,
            verifications: Vec::new(),
        }
    }

    /// Creates a record from a descriptor.
    ///
    /// The parent is left unset; it is wired through the hierarchy tracker.
    pub fn from_descriptor(id: NodeId, tier: Tier, desc: &NodeDescriptor, now: DateTime<Utc>) -> Self {
        Self {
            id,
            tier,
            keys: ExternalKeys {
                element_key: desc.element_key.clone(),
                vertex_key: desc.vertex_key.clone(),
                global_key: desc.global_key.clone(),
            },
            entity_type: desc.entity_type.clone(),
            name: desc.name.clone(),
            position: Coordinates::new(desc.x, desc.y, desc.z),
            source_file: plain_key(&desc.source_file_key),
            container: plain_key(&desc.container_key),
            status: ConstructionStatus::Designed,
            created_at: now,
            parent: None,
            exists: true,
            verifications: Vec::new(),
        }
    }
}
