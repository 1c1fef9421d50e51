//! App commands - import and list application packages

use console::style;
use std::fs::File;
use std::path::Path;
use stevedore_store::StoreError;

use crate::context::Context;
use crate::error::Result;

/// Import an application package tarball
pub fn import(ctx: &Context, tarball: &Path) -> Result<()> {
    let mut file = File::open(tarball)?;
    let app = ctx.apps()?.create_app(&mut file)?;

    println!(
        "{} {} ({})",
        style("Imported").green().bold(),
        app.locator,
        app.manifest.kind
    );
    Ok(())
}

/// List applications in a repository
pub fn list(ctx: &Context, repository: Option<&str>) -> Result<()> {
    let repository = repository.unwrap_or_else(|| ctx.config.repository());
    let apps = match ctx.apps()?.list_apps(repository) {
        Ok(apps) => apps,
        Err(StoreError::RepositoryNotFound { .. }) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    if apps.is_empty() {
        println!("No applications in {}", repository);
        return Ok(());
    }

    println!(
        "{:<50} {:<12}  {}",
        style("APPLICATION").bold(),
        style("KIND").bold(),
        style("DESCRIPTION").bold()
    );
    for app in &apps {
        println!(
            "{:<50} {:<12}  {}",
            app.locator.to_string(),
            app.manifest.kind.to_string(),
            app.manifest.metadata.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
