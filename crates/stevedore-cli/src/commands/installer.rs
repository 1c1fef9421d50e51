//! Installer command - offline installer for a stored application

use console::style;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use stevedore_core::TrustedCluster;
use stevedore_installer::{InstallerRequest, get_app_installer};
use stevedore_store::Account;

use super::{parse_additional, parse_locator};
use crate::context::Context;
use crate::display::field;
use crate::error::{CliError, Result};
use crate::util::format_size;

pub struct InstallerArgs<'a> {
    pub locator: &'a str,
    pub output: &'a Path,
    pub ca_cert: Option<&'a Path>,
    pub trusted_cluster: Option<&'a Path>,
    pub account: Option<&'a str>,
    pub encryption_key: Option<&'a str>,
    pub packages: &'a [String],
    pub apps: &'a [String],
}

pub fn run(ctx: &Context, args: InstallerArgs<'_>) -> Result<()> {
    let mut request = InstallerRequest::new(parse_locator(args.locator)?);
    request.additional = parse_additional(args.packages, args.apps)?;

    if let Some(path) = args.ca_cert {
        request.ca_cert = Some(std::fs::read_to_string(path)?);
    }

    if let Some(path) = args.trusted_cluster {
        let content = std::fs::read_to_string(path)?;
        let cluster = TrustedCluster::parse(&content).map_err(|e| CliError::Validation {
            message: format!("invalid trusted cluster {}: {}", path.display(), e),
            help: None,
        })?;
        request.trusted_cluster = Some(cluster);
    }

    if let Some(account) = args.account.map(str::to_string).or_else(|| ctx.config.account.clone()) {
        request.account = Account::new(account, "");
    }

    request.encryption_key = args.encryption_key.map(str::to_string);

    let apps = ctx.apps()?;
    let mut installer = get_app_installer(&request, &apps)?;

    println!(
        "{} installer for {}",
        style("Generating").cyan().bold(),
        request.application
    );

    let written = File::create(args.output)
        .map(BufWriter::new)
        .and_then(|mut out| {
            let written = std::io::copy(&mut installer, &mut out)?;
            out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
            Ok(written)
        });
    installer.close();

    let written = match written {
        Ok(written) => written,
        Err(e) => {
            let _ = std::fs::remove_file(args.output);
            return Err(e.into());
        }
    };

    println!(
        "  {} {}",
        style("Created").green().bold(),
        args.output.display()
    );
    field("Size", format_size(written));

    Ok(())
}
