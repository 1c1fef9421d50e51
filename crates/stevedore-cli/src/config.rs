//! User configuration
//!
//! Stored in `~/.config/stevedore/config.yaml`. Every field is optional and
//! command line flags take precedence.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stevedore_core::locator::SYSTEM_REPOSITORY;

use crate::error::{CliError, Result};

/// Configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StevedoreConfig {
    /// Local package store
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Account created in generated installers
    #[serde(default)]
    pub account: Option<String>,

    /// Default repository for listings and builds
    #[serde(default)]
    pub repository: Option<String>,
}

impl StevedoreConfig {
    /// Load configuration from `path`, or the default location
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| CliError::Validation {
            message: format!("invalid configuration {}: {}", path.display(), e),
            help: None,
        })
    }

    /// Default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("stevedore").join("config.yaml"))
    }

    /// State directory: the flag, then the config file, then the user data dir
    pub fn state_dir(&self, flag: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = flag.map(Path::to_path_buf).or_else(|| self.state_dir.clone()) {
            return Ok(dir);
        }
        dirs::data_dir()
            .map(|dir| dir.join("stevedore"))
            .ok_or_else(|| CliError::internal("Could not determine data directory"))
    }

    /// Repository used when a command does not name one
    pub fn repository(&self) -> &str {
        self.repository.as_deref().unwrap_or(SYSTEM_REPOSITORY)
    }
}
