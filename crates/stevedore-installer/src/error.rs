//! Error types for installer generation

use stevedore_core::{CoreError, ErrorKind, Locator};
use stevedore_store::StoreError;
use thiserror::Error;

/// Installer generation errors
///
/// Wrapping variants name the operation and the locator they failed on and
/// report the kind of their cause.
#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("invalid installer request: {message}")]
    InvalidRequest { message: String },

    #[error("unsupported application kind '{kind}' for {locator}")]
    UnsupportedKind { locator: Locator, kind: String },

    #[error("failed to read dependency {locator}")]
    Dependency {
        locator: Locator,
        #[source]
        source: StoreError,
    },

    #[error("failed to pull {locator}")]
    Pull {
        locator: Locator,
        #[source]
        source: StoreError,
    },

    #[error("{operation} failed")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("application {locator} does not declare the '{name}' package")]
    BinaryNotDeclared { locator: Locator, name: String },

    #[error("failed to render {name} script: {message}")]
    Script { name: String, message: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InstallerError::InvalidRequest { .. } => ErrorKind::Validation,
            InstallerError::UnsupportedKind { .. } => ErrorKind::UnsupportedKind,
            InstallerError::BinaryNotDeclared { .. } => ErrorKind::NotFound,
            InstallerError::Dependency { source, .. }
            | InstallerError::Pull { source, .. }
            | InstallerError::Store { source, .. } => source.kind(),
            InstallerError::Core(e) => e.kind(),
            InstallerError::Script { .. } | InstallerError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| InstallerError::Store { operation, source }
    }

    pub(crate) fn dependency(locator: &Locator) -> impl FnOnce(StoreError) -> Self + '_ {
        move |source| InstallerError::Dependency {
            locator: locator.clone(),
            source,
        }
    }

    pub(crate) fn pull(locator: &Locator) -> impl FnOnce(StoreError) -> Self + '_ {
        move |source| InstallerError::Pull {
            locator: locator.clone(),
            source,
        }
    }
}

/// Result type for installer operations
pub type Result<T> = std::result::Result<T, InstallerError>;
