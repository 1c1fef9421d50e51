//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - invalid request, manifest or input file
pub const VALIDATION_ERROR: i32 = 2;

/// Package error - missing, duplicate or unsupported package
pub const PACKAGE_ERROR: i32 = 4;

/// IO error - file not found, permission denied, unreadable content
pub const IO_ERROR: i32 = 5;
