//! Core error types

use thiserror::Error;

/// Coarse classification shared by every error type in the workspace
///
/// Call sites that tolerate specific conditions (the puller ignoring
/// already-registered applications, `exists` checks) match on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request, rejected before any side effect
    Validation,
    /// Missing package, application or dependency
    NotFound,
    /// Locator or record is already present
    AlreadyExists,
    /// Storage or filesystem failure
    Io,
    /// Manifest kind the installer cannot handle
    UnsupportedKind,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::Io => "io",
            ErrorKind::UnsupportedKind => "unsupported kind",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("Invalid trusted cluster: {message}")]
    InvalidTrustedCluster { message: String },

    #[error("File not found in archive: {path}")]
    ArchiveEntryNotFound { path: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ArchiveEntryNotFound { .. } => ErrorKind::NotFound,
            CoreError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
