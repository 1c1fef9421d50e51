//! Deps command - print an application's dependency closure

use console::style;
use stevedore_installer::{DependencyRequest, get_dependencies};

use super::{parse_additional, parse_locator};
use crate::context::Context;
use crate::error::Result;

pub fn run(ctx: &Context, locator: &str, packages: &[String], apps: &[String]) -> Result<()> {
    let locator = parse_locator(locator)?;
    let additional = parse_additional(packages, apps)?;

    let store = ctx.apps()?;
    let app = store.get_app(&locator)?;
    let deps = get_dependencies(
        DependencyRequest {
            app: &app,
            additional: &additional,
        },
        &store,
    )?;

    println!("{}", style(&locator).bold());
    if deps.is_empty() {
        println!("  {}", style("No dependencies").dim());
    } else {
        print!("{}", deps.render());
    }

    Ok(())
}
