//! Shared state for commands

use std::path::PathBuf;
use std::sync::Arc;
use stevedore_store::{Applications, LocalPackages};
use tracing::debug;

use crate::config::StevedoreConfig;
use crate::error::Result;

/// Resolved configuration and the local store location
#[derive(Debug, Clone)]
pub struct Context {
    pub config: StevedoreConfig,
    pub state_dir: PathBuf,
}

impl Context {
    pub fn new(config: StevedoreConfig, state_dir: PathBuf) -> Self {
        Self { config, state_dir }
    }

    /// Open the local store, creating it on first use
    pub fn packages(&self) -> Result<Arc<LocalPackages>> {
        debug!(state_dir = %self.state_dir.display(), "opening local store");
        Ok(Arc::new(LocalPackages::open(&self.state_dir)?))
    }

    pub fn apps(&self) -> Result<Applications> {
        Ok(Applications::new(self.packages()?))
    }
}
