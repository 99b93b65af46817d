//! Workspace layout and the `.edifice/config.json` file.

use edifice_core::{CoreError, Principal};
use edifice_graph::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DIR_NAME: &str = ".edifice";
const CONFIG_FILE: &str = "config.json";
const STORE_DIR: &str = "registry";
const CONFIG_VERSION: &str = "1.0";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Edifice not initialized in {0} (run `edifice init`)")]
    NotInitialized(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid minter: {0}")]
    Minter(#[from] CoreError),
}

/// Paths of an Edifice workspace rooted at some directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn at(root: &Path) -> Self {
        Self {
            dir: root.join(DIR_NAME),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.join(STORE_DIR)
    }

    pub fn is_initialized(&self) -> bool {
        self.config_path().exists()
    }
}

/// Contents of `.edifice/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub version: String,
    /// Principal allowed to mint, and the default acting principal.
    pub minter: Principal,
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl CliConfig {
    pub fn new(minter: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            version: CONFIG_VERSION.to_string(),
            minter: Principal::new(minter)?,
            registry: RegistryConfig::default(),
        })
    }

    pub fn load(workspace: &Workspace) -> Result<Self, ConfigError> {
        if !workspace.is_initialized() {
            return Err(ConfigError::NotInitialized(workspace.dir().to_path_buf()));
        }
        let text = fs::read_to_string(workspace.config_path())?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, workspace: &Workspace) -> Result<(), ConfigError> {
        fs::create_dir_all(workspace.dir())?;
        fs::write(workspace.config_path(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::at(dir.path());
        assert!(!workspace.is_initialized());

        let mut config = CliConfig::new("registry-admin").unwrap();
        config.registry.max_subgraph_nodes = 50;
        config.save(&workspace).unwrap();

        let loaded = CliConfig::load(&workspace).unwrap();
        assert_eq!(loaded.minter.as_str(), "registry-admin");
        assert_eq!(loaded.registry.max_subgraph_nodes, 50);
        assert_eq!(loaded.registry.work_budget, 30_000_000);
    }

    #[test]
    fn test_registry_section_optional() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::at(dir.path());
        fs::create_dir_all(workspace.dir()).unwrap();
        fs::write(
            workspace.config_path(),
            r#"{"version": "1.0", "minter": "ops"}"#,
        )
        .unwrap();

        let loaded = CliConfig::load(&workspace).unwrap();
        assert_eq!(loaded.registry.max_subgraph_nodes, 1000);
    }

    #[test]
    fn test_missing_config() {
        let dir = tempdir().unwrap();
        let err = CliConfig::load(&Workspace::at(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::NotInitialized(_)));
    }

    #[test]
    fn test_blank_minter_rejected() {
        assert!(matches!(CliConfig::new("  "), Err(ConfigError::Minter(_))));
    }
}
