//! Package commands - import and list raw packages

use console::style;
use std::fs::File;
use std::path::Path;
use stevedore_store::{PackageOptions, PackageService, StoreError};

use super::parse_locator;
use crate::context::Context;
use crate::error::Result;
use crate::util::{format_labels, format_size, parse_labels, truncate_hash};

/// Import a file as a package
pub fn import(ctx: &Context, locator: &str, file: &Path, labels: &[String]) -> Result<()> {
    let locator = parse_locator(locator)?;
    let labels = parse_labels(labels)?;
    let mut content = File::open(file)?;

    let packages = ctx.packages()?;
    packages.upsert_repository(&locator.repository, None)?;
    let envelope =
        packages.create_package(&locator, &mut content, PackageOptions::with_labels(labels))?;

    println!(
        "{} {} ({})",
        style("Imported").green().bold(),
        envelope.locator,
        format_size(envelope.size_bytes)
    );
    Ok(())
}

/// List packages in a repository
pub fn list(ctx: &Context, repository: Option<&str>) -> Result<()> {
    let repository = repository.unwrap_or_else(|| ctx.config.repository());
    let packages = match ctx.packages()?.get_packages(repository) {
        Ok(packages) => packages,
        Err(StoreError::RepositoryNotFound { .. }) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    if packages.is_empty() {
        println!("No packages in {}", repository);
        return Ok(());
    }

    println!(
        "{:<50} {:>10}  {:<16}  {}",
        style("PACKAGE").bold(),
        style("SIZE").bold(),
        style("SHA256").bold(),
        style("LABELS").bold()
    );
    for envelope in &packages {
        println!(
            "{:<50} {:>10}  {:<16}  {}",
            envelope.locator.to_string(),
            format_size(envelope.size_bytes),
            truncate_hash(&envelope.sha256, 16),
            format_labels(&envelope.runtime_labels)
        );
    }
    Ok(())
}
