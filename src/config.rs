//! Store and layout settings, loadable from YAML

use crate::query::ParameterMode;
use notegraph_layout::LayoutConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Property graph store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file created inside each graph directory
    pub database_file: String,
    /// Create a graph directory (and its parents) when it does not exist
    pub create_missing_dirs: bool,
    /// Bind values as parameters, or inline them as escaped literals
    pub parameter_mode: ParameterMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_file: "database.ngdb".to_string(),
            create_missing_dirs: true,
            parameter_mode: ParameterMode::Bind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteGraphConfig {
    pub store: StoreConfig,
    pub layout: LayoutConfig,
}

impl NoteGraphConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
