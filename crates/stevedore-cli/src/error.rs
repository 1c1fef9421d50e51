//! CLI error types with exit code handling
//!
//! Library errors are classified by their `ErrorKind` and mapped to the
//! matching exit code.

use miette::Diagnostic;
use stevedore_builder::BuildError;
use stevedore_core::{CoreError, ErrorKind};
use stevedore_installer::InstallerError;
use stevedore_store::StoreError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid input, manifest or request
    #[error("Validation failed: {message}")]
    #[diagnostic(code(stevedore::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Package missing, already present or of an unsupported kind
    #[error("Package error: {message}")]
    #[diagnostic(code(stevedore::cli::package))]
    Package {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(stevedore::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(stevedore::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Package { .. } => exit_codes::PACKAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an input error (user provided invalid input)
    pub fn input(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Classify a library error by its kind
    fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Validation => Self::Validation {
                message,
                help: None,
            },
            ErrorKind::NotFound => Self::Package {
                message,
                help: Some(
                    "Import it with 'stevedore package import' or 'stevedore app import'"
                        .to_string(),
                ),
            },
            ErrorKind::AlreadyExists | ErrorKind::UnsupportedKind => Self::Package {
                message,
                help: None,
            },
            ErrorKind::Io => Self::Io { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<InstallerError> for CliError {
    fn from(err: InstallerError) -> Self {
        Self::from_kind(err.kind(), error_chain(&err))
    }
}

impl From<BuildError> for CliError {
    fn from(err: BuildError) -> Self {
        Self::from_kind(err.kind(), error_chain(&err))
    }
}

/// Join an error with its causes, skipping causes already in the message
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use stevedore_core::Locator;

    #[test]
    fn test_exit_codes_by_kind() {
        let missing = StoreError::PackageNotFound {
            locator: Locator::parse("gravitational.io/planet:7.0.1").unwrap(),
        };
        assert_eq!(CliError::from(missing).exit_code(), exit_codes::PACKAGE_ERROR);

        let invalid = InstallerError::InvalidRequest {
            message: "encrypted installers are not supported".to_string(),
        };
        assert_eq!(CliError::from(invalid).exit_code(), exit_codes::VALIDATION_ERROR);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(CliError::from(io).exit_code(), exit_codes::IO_ERROR);
    }
}
