//! Error types for storage operations

use stevedore_core::{CoreError, ErrorKind, Locator};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    // ============ Lookup Errors ============
    #[error("package {locator} not found")]
    PackageNotFound { locator: Locator },

    #[error("repository '{name}' not found")]
    RepositoryNotFound { name: String },

    #[error("account '{id}' not found")]
    AccountNotFound { id: String },

    // ============ Conflict Errors ============
    #[error("package {locator} already exists")]
    PackageAlreadyExists { locator: Locator },

    #[error("account '{id}' already exists")]
    AccountAlreadyExists { id: String },

    // ============ Application Errors ============
    #[error("package {locator} is not an application")]
    NotAnApplication { locator: Locator },

    #[error("invalid application package: {message}")]
    InvalidApplication { message: String },

    #[error("package {locator}: {message}")]
    Encryption { locator: Locator, message: String },

    // ============ Storage Errors ============
    #[error("failed to read content of {locator}: {source}")]
    ContentUnreadable {
        locator: Locator,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::PackageNotFound { .. }
            | StoreError::RepositoryNotFound { .. }
            | StoreError::AccountNotFound { .. } => ErrorKind::NotFound,
            StoreError::PackageAlreadyExists { .. } | StoreError::AccountAlreadyExists { .. } => {
                ErrorKind::AlreadyExists
            }
            StoreError::NotAnApplication { .. }
            | StoreError::InvalidApplication { .. }
            | StoreError::Encryption { .. } => ErrorKind::Validation,
            StoreError::Core(e) => e.kind(),
            StoreError::ContentUnreadable { .. }
            | StoreError::Database(_)
            | StoreError::Io(_)
            | StoreError::Serialization(_) => ErrorKind::Io,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;
