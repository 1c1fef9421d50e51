//! Error types for application builds

use std::path::PathBuf;
use stevedore_core::{CoreError, ErrorKind};
use stevedore_installer::InstallerError;
use stevedore_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid chart at {path}: {message}")]
    InvalidChart { path: PathBuf, message: String },

    #[error("Output file {path} already exists, use --overwrite to replace it")]
    OutputExists { path: PathBuf },

    #[error("Failed to open image {path}: {message}")]
    InvalidImage { path: PathBuf, message: String },

    #[error("Failed to vendor {path}: {source}")]
    Vendor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Installer(#[from] InstallerError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::InvalidChart { .. }
            | BuildError::OutputExists { .. }
            | BuildError::InvalidImage { .. }
            | BuildError::YamlParse(_) => ErrorKind::Validation,
            BuildError::Store(e) => e.kind(),
            BuildError::Installer(e) => e.kind(),
            BuildError::Core(e) => e.kind(),
            BuildError::Vendor { .. } | BuildError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
