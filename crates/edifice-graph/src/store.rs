//! Local snapshot storage for a registry.
//!
//! The whole registry is serialized with bincode and kept under a single
//! key in a sled database, next to a format version. A snapshot written by
//! a different format version is refused rather than misread. The clock is
//! not persisted; a loaded registry uses the system clock until told
//! otherwise.

use crate::registry::Registry;
use sled::Db;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const SNAPSHOT_KEY: &str = "registry_snapshot";
const VERSION_KEY: &str = "snapshot_format";

/// Bumped whenever the serialized shape of `Registry` changes.
pub const SNAPSHOT_FORMAT: u32 = 2;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("Snapshot format {found} is not supported (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },
}

pub struct RegistryStore {
    db: Db,
}

impl RegistryStore {
    /// Opens or creates a registry store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Saves a snapshot of the registry, replacing the previous one.
    ///
    /// Snapshot and version are written in one batch.
    pub fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        let bytes = bincode::serialize(registry)?;
        let mut batch = sled::Batch::default();
        batch.insert(VERSION_KEY, SNAPSHOT_FORMAT.to_le_bytes().to_vec());
        batch.insert(SNAPSHOT_KEY, bytes);
        self.db.apply_batch(batch)?;
        self.db.flush()?;
        debug!("Saved registry snapshot ({} records)", registry.node_count());
        Ok(())
    }

    /// Loads the last saved snapshot, if any.
    pub fn load(&self) -> Result<Option<Registry>, StoreError> {
        let Some(bytes) = self.db.get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };

        let found = self.format()?.unwrap_or(0);
        if found != SNAPSHOT_FORMAT {
            return Err(StoreError::UnsupportedFormat {
                found,
                expected: SNAPSHOT_FORMAT,
            });
        }

        let registry: Registry = bincode::deserialize(&bytes)?;
        Ok(Some(registry))
    }

    /// Format version recorded with the stored snapshot.
    pub fn format(&self) -> Result<Option<u32>, StoreError> {
        Ok(self.db.get(VERSION_KEY)?.map(|raw| {
            let mut word = [0u8; 4];
            let len = raw.len().min(4);
            word[..len].copy_from_slice(&raw[..len]);
            u32::from_le_bytes(word)
        }))
    }

    /// Removes the stored snapshot.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.db.remove(SNAPSHOT_KEY)?;
        self.db.remove(VERSION_KEY)?;
        self.db.flush()?;
        Ok(())
    }
}
