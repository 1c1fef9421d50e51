//! CLI commands

pub mod app;
pub mod build;
pub mod deps;
pub mod installer;
pub mod package;

use stevedore_core::{Dependencies, Locator};

use crate::error::{CliError, Result};

/// Parse a locator argument
pub(crate) fn parse_locator(input: &str) -> Result<Locator> {
    Locator::parse(input).map_err(|e| CliError::Validation {
        message: e.to_string(),
        help: Some("Locators have the form repository/name:version".to_string()),
    })
}

/// Additional dependencies from `--package` and `--app` arguments
pub(crate) fn parse_additional(packages: &[String], apps: &[String]) -> Result<Dependencies> {
    Ok(Dependencies {
        packages: packages
            .iter()
            .map(|p| parse_locator(p))
            .collect::<Result<_>>()?,
        apps: apps.iter().map(|a| parse_locator(a)).collect::<Result<_>>()?,
    })
}
